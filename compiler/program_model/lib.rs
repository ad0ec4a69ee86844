use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod builder;
mod consistency;
mod typed_ast;
mod types;

pub use builder::ProgramModelBuilder;
pub use consistency::check_consistency;
pub use typed_ast::{
    AssignmentTarget, BinaryOperator, Command, Expression, Literal, UnaryOperator,
};
pub use types::{ArrayTypeId, ClassId, CodeId, FieldId, Type};

pub const OBJECT_CLASS_NAME: &str = "Object";
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Fully type-checked program handed to the backend. Read-only once built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgramModel {
    classes: Vec<ClassDeclaration>,
    fields: Vec<FieldSignature>,
    code: Vec<CodeSignature>,
    array_element_types: Vec<Type>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassDeclaration {
    pub name: String,
    pub superclass: Option<ClassId>,
    pub field_by_name: BTreeMap<String, FieldId>,
    pub constructors: Vec<CodeId>,
    pub method_overloads_by_name: BTreeMap<String, Vec<CodeId>>,
    pub subclasses: Vec<ClassId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldSignature {
    pub class: ClassId,
    pub name: String,
    pub field_type: Type,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    Constructor,
    Method,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeSignature {
    pub kind: CodeKind,
    pub class: ClassId,
    pub name: String,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
    pub body: Command,
}

impl CodeSignature {
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.kind == CodeKind::Constructor
    }

    /// Local slots taken by `this` and the parameters.
    #[must_use]
    pub fn parameter_slot_count(&self) -> usize {
        1 + self
            .parameter_types
            .iter()
            .map(|parameter_type| parameter_type.stack_size())
            .sum::<usize>()
    }
}

impl ProgramModel {
    #[must_use]
    pub fn object_class(&self) -> ClassId {
        ClassId(0)
    }

    #[must_use]
    pub fn class(&self, class_id: ClassId) -> &ClassDeclaration {
        &self.classes[class_id.index()]
    }

    #[must_use]
    pub fn field(&self, field_id: FieldId) -> &FieldSignature {
        &self.fields[field_id.index()]
    }

    #[must_use]
    pub fn code(&self, code_id: CodeId) -> &CodeSignature {
        &self.code[code_id.index()]
    }

    #[must_use]
    pub fn array_element_type(&self, array_type_id: ArrayTypeId) -> Type {
        self.array_element_types[array_type_id.index()]
    }

    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len()).map(|index| ClassId(index as u32))
    }

    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        (0..self.fields.len()).map(|index| FieldId(index as u32))
    }

    pub fn code_ids(&self) -> impl Iterator<Item = CodeId> + '_ {
        (0..self.code.len()).map(|index| CodeId(index as u32))
    }

    pub fn array_type_ids(&self) -> impl Iterator<Item = ArrayTypeId> + '_ {
        (0..self.array_element_types.len()).map(|index| ArrayTypeId(index as u32))
    }

    #[must_use]
    pub fn class_named(&self, name: &str) -> Option<ClassId> {
        self.class_ids().find(|class_id| self.class(*class_id).name == name)
    }

    /// Interned array type for `element_type`, if the model declares one.
    #[must_use]
    pub fn array_type_of(&self, element_type: Type) -> Option<Type> {
        self.array_type_ids()
            .find(|array_type_id| self.array_element_type(*array_type_id) == element_type)
            .map(Type::Array)
    }

    /// `class_id` followed by each of its superclasses up to the root.
    pub fn superclass_chain(&self, class_id: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(Some(class_id), move |current| self.class(*current).superclass)
    }

    #[must_use]
    pub fn is_subclass_of(&self, class_id: ClassId, ancestor: ClassId) -> bool {
        self.superclass_chain(class_id).any(|current| current == ancestor)
    }

    #[must_use]
    pub fn method_in_class(
        &self,
        class_id: ClassId,
        name: &str,
        parameter_types: &[Type],
    ) -> Option<CodeId> {
        self.class(class_id)
            .method_overloads_by_name
            .get(name)?
            .iter()
            .copied()
            .find(|code_id| self.code(*code_id).parameter_types == parameter_types)
    }

    #[must_use]
    pub fn constructor_in_class(
        &self,
        class_id: ClassId,
        parameter_types: &[Type],
    ) -> Option<CodeId> {
        self.class(class_id)
            .constructors
            .iter()
            .copied()
            .find(|code_id| self.code(*code_id).parameter_types == parameter_types)
    }

    #[must_use]
    pub fn zero_argument_constructor(&self, class_id: ClassId) -> Option<CodeId> {
        self.constructor_in_class(class_id, &[])
    }

    #[must_use]
    pub fn describe_type(&self, value_type: Type) -> String {
        match value_type {
            Type::Int => "int".to_string(),
            Type::Float => "float".to_string(),
            Type::Boolean => "boolean".to_string(),
            Type::String => "String".to_string(),
            Type::Nil => "nil".to_string(),
            Type::Void => "void".to_string(),
            Type::Class(class_id) => self.class(class_id).name.clone(),
            Type::Array(array_type_id) => {
                format!("{}[]", self.describe_type(self.array_element_type(array_type_id)))
            }
        }
    }

    /// Human readable identity: `Class.name(types): type` for methods and
    /// `Class(types)` for constructors.
    #[must_use]
    pub fn describe_code(&self, code_id: CodeId) -> String {
        let code = self.code(code_id);
        let parameters = code
            .parameter_types
            .iter()
            .map(|parameter_type| self.describe_type(*parameter_type))
            .collect::<Vec<_>>()
            .join(", ");
        let class_name = &self.class(code.class).name;
        match code.kind {
            CodeKind::Constructor => format!("{class_name}({parameters})"),
            CodeKind::Method => format!(
                "{class_name}.{}({parameters}): {}",
                code.name,
                self.describe_type(code.return_type)
            ),
        }
    }

    #[must_use]
    pub fn describe_field(&self, field_id: FieldId) -> String {
        let field = self.field(field_id);
        format!(
            "{}.{}: {}",
            self.class(field.class).name,
            field.name,
            self.describe_type(field.field_type)
        )
    }
}
