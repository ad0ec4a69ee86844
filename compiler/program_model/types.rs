use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrayTypeId(pub u32);

impl ClassId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FieldId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl CodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ArrayTypeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Static type of a value. Class and array types are interned in the
/// [`crate::ProgramModel`], so two equal types always carry equal ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Int,
    Float,
    Boolean,
    String,
    Nil,
    Void,
    Class(ClassId),
    Array(ArrayTypeId),
}

impl Type {
    /// Number of operand stack slots a value of this type occupies.
    #[must_use]
    pub fn stack_size(self) -> usize {
        match self {
            Type::Void => 0,
            _ => 1,
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    #[must_use]
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            Type::String | Type::Nil | Type::Class(_) | Type::Array(_)
        )
    }

    #[must_use]
    pub fn class_id(self) -> Option<ClassId> {
        match self {
            Type::Class(class_id) => Some(class_id),
            _ => None,
        }
    }
}
