use crate::name_list::{ClassNameList, NameIndex};
use crate::names::{ClassName, Name};
use crate::Error;
use std::cmp::Ordering;

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

/// Reference type, with classes named by their index in the class name list
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType {
    Object(NameIndex),
    ObjectArray(ArrayType<NameIndex>),
    PrimitiveArray(ArrayType<BaseType>),
}

/// Generic array type
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayType<T> {
    /// Additional dimensions (`A[]` has 0 additional dimensions, `A[][][][]` has 3)
    pub additional_dimensions: usize,

    /// Underlying element type (`A` is the underlying element type of `A[][]`)
    pub element_type: T,
}

/// These types are from [this hierarchy][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.10.1.2
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum VerificationType {
    Integer,
    Float,
    Double,
    Long,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after `<init>` is called
    UninitializedThis,

    /// Object type
    Object(RefType),

    /// Result of a `new` instruction (at the given bytecode offset) before `<init>` is called
    Uninitialized(u16),
}

/// Outcome of checking two verification types against each other
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Compatibility {
    Compatible,
    Incompatible,

    /// Compatible exactly when the first class is assignable to the second
    Requires { source: NameIndex, target: NameIndex },
}

/// Decide if a value of type `source` can be used where `target` is expected
///
/// Everything that can be decided from the shape of the types alone is decided here. The rest
/// boils down to a relationship between two classes, which is left to the caller.
pub fn check_compatible(
    source: &VerificationType,
    target: &VerificationType,
    names: &ClassNameList,
) -> Result<Compatibility, Error> {
    use Compatibility::*;

    if source == target {
        return Ok(Compatible);
    }

    let target_ref = match target {
        VerificationType::Object(target_ref) => target_ref,
        _ => return Ok(Incompatible),
    };
    let source_ref = match source {
        VerificationType::Null => return Ok(Compatible),
        VerificationType::Object(source_ref) => source_ref,
        _ => return Ok(Incompatible),
    };

    let compatibility = match (source_ref, target_ref) {
        (_, RefType::Object(target_cls)) if *target_cls == NameIndex::OBJECT => Compatible,

        // Special superclass and interfaces of all arrays
        (RefType::PrimitiveArray(_) | RefType::ObjectArray(_), RefType::Object(target_cls)) => {
            from_bool(is_array_super_type(names.lookup(*target_cls)?))
        }

        // Primitive arrays must match in dimension and type
        (RefType::PrimitiveArray(arr1), RefType::PrimitiveArray(arr2)) => from_bool(arr1 == arr2),

        // Higher dimensional primitive arrays can be subtypes of object arrays
        (RefType::PrimitiveArray(arr1), RefType::ObjectArray(arr2)) => {
            match arr1.additional_dimensions.cmp(&arr2.additional_dimensions) {
                Ordering::Less | Ordering::Equal => Incompatible,
                Ordering::Greater => {
                    from_bool(is_array_super_type(names.lookup(arr2.element_type)?))
                }
            }
        }

        // Covariance of arrays
        (RefType::ObjectArray(arr1), RefType::ObjectArray(arr2)) => {
            match arr1.additional_dimensions.cmp(&arr2.additional_dimensions) {
                Ordering::Less => Incompatible,
                Ordering::Equal if arr1.element_type == arr2.element_type => Compatible,
                Ordering::Equal if arr2.element_type == NameIndex::OBJECT => Compatible,
                Ordering::Equal => Requires {
                    source: arr1.element_type,
                    target: arr2.element_type,
                },
                Ordering::Greater => {
                    from_bool(is_array_super_type(names.lookup(arr2.element_type)?))
                }
            }
        }

        (RefType::Object(source_cls), RefType::Object(target_cls)) => Requires {
            source: *source_cls,
            target: *target_cls,
        },

        (RefType::Object(_), RefType::ObjectArray(_) | RefType::PrimitiveArray(_))
        | (RefType::ObjectArray(_), RefType::PrimitiveArray(_)) => Incompatible,
    };
    Ok(compatibility)
}

fn from_bool(compatible: bool) -> Compatibility {
    if compatible {
        Compatibility::Compatible
    } else {
        Compatibility::Incompatible
    }
}

/// Arrays only have a small, finite set of super types
fn is_array_super_type(name: &[u8]) -> bool {
    name == ClassName::OBJECT.as_bytes()
        || name == ClassName::CLONEABLE.as_bytes()
        || name == ClassName::SERIALIZABLE.as_bytes()
}

#[cfg(test)]
mod test {
    use super::{check_compatible, ArrayType, BaseType, Compatibility, RefType, VerificationType};
    use crate::name_list::{ClassNameList, NameIndex};

    fn object(idx: NameIndex) -> VerificationType {
        VerificationType::Object(RefType::Object(idx))
    }

    fn object_array(additional_dimensions: usize, idx: NameIndex) -> VerificationType {
        VerificationType::Object(RefType::ObjectArray(ArrayType {
            additional_dimensions,
            element_type: idx,
        }))
    }

    fn int_array(additional_dimensions: usize) -> VerificationType {
        VerificationType::Object(RefType::PrimitiveArray(ArrayType {
            additional_dimensions,
            element_type: BaseType::Int,
        }))
    }

    #[test]
    fn primitives_and_null() {
        use Compatibility::*;
        let names = ClassNameList::new();
        let check = |s: VerificationType, t: VerificationType| {
            check_compatible(&s, &t, &names).unwrap()
        };
        let string = object(NameIndex(7));

        assert_eq!(
            check(VerificationType::Integer, VerificationType::Integer),
            Compatible
        );
        assert_eq!(
            check(VerificationType::Integer, VerificationType::Float),
            Incompatible
        );
        assert_eq!(
            check(VerificationType::Null, string),
            Compatible,
            "null <: any reference"
        );
        assert_eq!(check(string, VerificationType::Null), Incompatible);
        assert_eq!(
            check(VerificationType::Null, VerificationType::Long),
            Incompatible
        );
        assert_eq!(
            check(
                VerificationType::Uninitialized(3),
                VerificationType::Uninitialized(4)
            ),
            Incompatible
        );
    }

    #[test]
    fn classes_and_arrays() {
        use Compatibility::*;
        let mut names = ClassNameList::new();
        let app = names.intern(b"me/App").unwrap();
        let base = names.intern(b"me/Base").unwrap();
        let cloneable = names.intern(b"java/lang/Cloneable").unwrap();
        let check = |s: VerificationType, t: VerificationType| {
            check_compatible(&s, &t, &names).unwrap()
        };

        assert_eq!(check(object(app), object(NameIndex::OBJECT)), Compatible);
        assert_eq!(
            check(object(app), object(base)),
            Requires {
                source: app,
                target: base
            }
        );
        assert_eq!(
            check(int_array(0), object(cloneable)),
            Compatible,
            "int[] <: java.lang.Cloneable"
        );
        assert_eq!(check(int_array(0), object(base)), Incompatible);
        assert_eq!(check(int_array(0), int_array(1)), Incompatible);
        assert_eq!(
            check(int_array(1), object_array(0, NameIndex::OBJECT)),
            Compatible,
            "int[][] <: java.lang.Object[]"
        );
        assert_eq!(
            check(int_array(0), object_array(0, NameIndex::OBJECT)),
            Incompatible,
            "int[] </: java.lang.Object[]"
        );
        assert_eq!(
            check(object_array(0, app), object_array(0, base)),
            Requires {
                source: app,
                target: base
            },
            "me.App[] <: me.Base[] iff me.App <: me.Base"
        );
        assert_eq!(
            check(object_array(1, app), object_array(0, cloneable)),
            Compatible
        );
        assert_eq!(
            check(object_array(1, app), object_array(0, base)),
            Incompatible
        );
        assert_eq!(
            check(object_array(0, app), object_array(1, app)),
            Incompatible
        );
        assert_eq!(check(object(app), object_array(0, app)), Incompatible);
    }

    #[test]
    fn unknown_name_index() {
        let names = ClassNameList::new();
        assert!(check_compatible(&int_array(0), &object(NameIndex(42)), &names).is_err());
    }
}
