use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum RuntimeValue {
    Int(i32),
    Float(f32),
    String(Rc<str>),
    Null,
    /// Index into the machine's heap.
    Reference(usize),
}

impl RuntimeValue {
    /// Zero value of a type descriptor.
    pub(crate) fn default_for(descriptor: &str) -> Self {
        match descriptor.as_bytes().first() {
            Some(b'I' | b'Z') => Self::Int(0),
            Some(b'F') => Self::Float(0.0),
            _ => Self::Null,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Null => "nil",
            Self::Reference(_) => "reference",
        }
    }
}

#[derive(Debug)]
pub(crate) enum HeapEntry {
    Object {
        class: String,
        field_value_by_key: BTreeMap<(String, String), RuntimeValue>,
    },
    Array {
        elements: Vec<RuntimeValue>,
    },
}

/// Number of parameters in a member descriptor such as `(I[LNode;T)V`.
pub(crate) fn parameter_count(descriptor: &str) -> Option<usize> {
    let parameters = descriptor.strip_prefix('(')?.split_once(')')?.0;
    let mut bytes = parameters.bytes();
    let mut count = 0;
    while let Some(byte) = bytes.next() {
        match byte {
            b'[' => continue,
            b'L' => {
                bytes.by_ref().find(|byte| *byte == b';')?;
            }
            b'I' | b'F' | b'Z' | b'T' | b'N' => {}
            _ => return None,
        }
        count += 1;
    }
    Some(count)
}

pub(crate) fn return_descriptor(descriptor: &str) -> Option<&str> {
    descriptor.split_once(')').map(|(_, return_type)| return_type)
}
