use compiler__program_model::{CONSTRUCTOR_NAME, CodeId, FieldId, ProgramModel, Type};

use crate::MemberReference;

#[must_use]
pub fn type_descriptor(model: &ProgramModel, value_type: Type) -> String {
    match value_type {
        Type::Int => "I".to_string(),
        Type::Float => "F".to_string(),
        Type::Boolean => "Z".to_string(),
        Type::String => "T".to_string(),
        Type::Nil => "N".to_string(),
        Type::Void => "V".to_string(),
        Type::Class(class) => format!("L{};", model.class(class).name),
        Type::Array(array_type) => {
            format!(
                "[{}",
                type_descriptor(model, model.array_element_type(array_type))
            )
        }
    }
}

/// `(params)return`, e.g. `(IF)Z` or `([LNode;)V`.
#[must_use]
pub fn member_descriptor(model: &ProgramModel, code: CodeId) -> String {
    let signature = model.code(code);
    let parameters = signature
        .parameter_types
        .iter()
        .map(|parameter_type| type_descriptor(model, *parameter_type))
        .collect::<String>();
    format!(
        "({parameters}){}",
        type_descriptor(model, signature.return_type)
    )
}

#[must_use]
pub(crate) fn member_name(model: &ProgramModel, code: CodeId) -> &str {
    let signature = model.code(code);
    if signature.is_constructor() {
        CONSTRUCTOR_NAME
    } else {
        &signature.name
    }
}

/// Reference to `code` as declared, owned by its declaring class.
#[must_use]
pub fn member_reference(model: &ProgramModel, code: CodeId) -> MemberReference {
    let signature = model.code(code);
    MemberReference {
        owner: model.class(signature.class).name.clone(),
        name: member_name(model, code).to_string(),
        descriptor: member_descriptor(model, code),
    }
}

#[must_use]
pub fn field_reference(model: &ProgramModel, field: FieldId) -> MemberReference {
    let signature = model.field(field);
    MemberReference {
        owner: model.class(signature.class).name.clone(),
        name: signature.name.clone(),
        descriptor: type_descriptor(model, signature.field_type),
    }
}
