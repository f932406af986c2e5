use std::borrow::{Borrow, Cow};
use std::collections::TryReserveError;
use std::fmt::{Debug, Display, Error as FmtError, Formatter};

/// Names of classes and interfaces, in internal form (eg. `java/lang/Object`)
///
/// Names are kept as raw bytes since that is how they are stored in class files (modified UTF-8)
/// and in serialized snippet buffers. Nothing in verification needs to decode them.
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.1>
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ClassName(Cow<'static, [u8]>);

/// Extracts the raw underlying name
impl AsRef<[u8]> for ClassName {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// Lets maps keyed by names be queried with plain byte slices
impl Borrow<[u8]> for ClassName {
    fn borrow(&self) -> &[u8] {
        self.0.as_ref()
    }
}

pub trait Name: Sized {
    /// Check if some bytes would be a valid name
    fn check_valid(name: impl AsRef<[u8]>) -> Result<(), String>;

    /// Extract the raw underlying data
    fn as_cow(&self) -> &Cow<'static, [u8]>;

    /// Extract the raw underlying name
    fn as_bytes(&self) -> &[u8] {
        self.as_cow().as_ref()
    }

    /// Try to construct a name from a string
    fn from_string(name: String) -> Result<Self, String>;
}

impl Name for ClassName {
    fn check_valid(name: impl AsRef<[u8]>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(String::from("Class name is empty"));
        }
        for segment in name.split(|b| *b == b'/') {
            if segment.is_empty() {
                return Err(format!(
                    "Class name '{}' has an empty segment",
                    String::from_utf8_lossy(name)
                ));
            } else if segment.iter().any(|b| matches!(b, b'.' | b';' | b'[')) {
                return Err(format!(
                    "Class name '{}' contains an illegal character",
                    String::from_utf8_lossy(name)
                ));
            }
        }
        Ok(())
    }

    fn as_cow(&self) -> &Cow<'static, [u8]> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        ClassName::from_bytes(name.into_bytes())
    }
}

impl Debug for ClassName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl Display for ClassName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl ClassName {
    /// Try to construct a name from raw bytes
    pub fn from_bytes(name: Vec<u8>) -> Result<ClassName, String> {
        Self::check_valid(&name)?;
        Ok(ClassName(Cow::Owned(name)))
    }

    /// Wrap bytes without validating them
    ///
    /// Names coming out of the class file reader were already validated there.
    pub(crate) fn from_bytes_unchecked(name: Vec<u8>) -> ClassName {
        ClassName(Cow::Owned(name))
    }

    /// Number of bytes in the name
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    const fn name(value: &'static str) -> ClassName {
        ClassName(Cow::Borrowed(value.as_bytes()))
    }

    // JDK names
    pub const CHARSEQUENCE: Self = Self::name("java/lang/CharSequence");
    pub const CLONEABLE: Self = Self::name("java/lang/Cloneable");
    pub const ERROR: Self = Self::name("java/lang/Error");
    pub const EXCEPTION: Self = Self::name("java/lang/Exception");
    pub const INTEGER: Self = Self::name("java/lang/Integer");
    pub const NUMBER: Self = Self::name("java/lang/Number");
    pub const OBJECT: Self = Self::name("java/lang/Object");
    pub const RUNNABLE: Self = Self::name("java/lang/Runnable");
    pub const RUNTIMEEXCEPTION: Self = Self::name("java/lang/RuntimeException");
    pub const SERIALIZABLE: Self = Self::name("java/io/Serializable");
    pub const STRING: Self = Self::name("java/lang/String");
    pub const THROWABLE: Self = Self::name("java/lang/Throwable");
}

/// Copy name bytes into a fresh exactly-sized allocation, reporting allocation failure
pub(crate) fn copy_name(name: &[u8]) -> Result<Box<[u8]>, TryReserveError> {
    let mut owned: Vec<u8> = Vec::new();
    owned.try_reserve_exact(name.len())?;
    owned.extend_from_slice(name);
    Ok(owned.into_boxed_slice())
}
