use super::{ClassData, ClassGraph, ClassId};
use crate::names::ClassName;
use elsa::FrozenVec;

/// Classes from `java.*` that verification relies on
///
/// The verifier treats `java/lang/Object` and `java/lang/Throwable` specially, and arrays are
/// always assignable to `java/lang/Cloneable` and `java/io/Serializable`. The rest are common
/// enough to be useful when setting up a class graph.
pub struct JavaClasses<'g> {
    pub object: ClassId<'g>,
    pub cloneable: ClassId<'g>,
    pub serializable: ClassId<'g>,
    pub runnable: ClassId<'g>,
    pub char_sequence: ClassId<'g>,
    pub string: ClassId<'g>,
    pub number: ClassId<'g>,
    pub integer: ClassId<'g>,
    pub throwable: ClassId<'g>,
    pub error: ClassId<'g>,
    pub exception: ClassId<'g>,
    pub runtime_exception: ClassId<'g>,
}

impl<'g> JavaClasses<'g> {
    pub fn add_to_graph(class_graph: &ClassGraph<'g>) -> JavaClasses<'g> {
        let object = class_graph.add_class(ClassData {
            name: ClassName::OBJECT,
            superclass: None,
            interfaces: FrozenVec::new(),
            is_interface: false,
        });

        let interface = |name: ClassName| -> ClassId<'g> {
            class_graph.add_class(ClassData::new(name, object, true))
        };
        let cloneable = interface(ClassName::CLONEABLE);
        let serializable = interface(ClassName::SERIALIZABLE);
        let runnable = interface(ClassName::RUNNABLE);
        let char_sequence = interface(ClassName::CHARSEQUENCE);

        let string = class_graph.add_class(ClassData::new(ClassName::STRING, object, false));
        string.add_interface(serializable);
        string.add_interface(char_sequence);

        let number = class_graph.add_class(ClassData::new(ClassName::NUMBER, object, false));
        number.add_interface(serializable);
        let integer = class_graph.add_class(ClassData::new(ClassName::INTEGER, number, false));

        let throwable = class_graph.add_class(ClassData::new(ClassName::THROWABLE, object, false));
        throwable.add_interface(serializable);
        let error = class_graph.add_class(ClassData::new(ClassName::ERROR, throwable, false));
        let exception =
            class_graph.add_class(ClassData::new(ClassName::EXCEPTION, throwable, false));
        let runtime_exception = class_graph.add_class(ClassData::new(
            ClassName::RUNTIMEEXCEPTION,
            exception,
            false,
        ));

        JavaClasses {
            object,
            cloneable,
            serializable,
            runnable,
            char_sequence,
            string,
            number,
            integer,
            throwable,
            error,
            exception,
            runtime_exception,
        }
    }
}
