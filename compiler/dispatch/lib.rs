use std::collections::BTreeSet;

use compiler__program_model::{ClassId, CodeId, CodeKind, ProgramModel, Type};

/// `class_id` together with all of its direct and indirect subclasses, in
/// breadth-first declaration order.
#[must_use]
pub fn instances(model: &ProgramModel, class_id: ClassId) -> Vec<ClassId> {
    let mut instances = vec![class_id];
    let mut next_index = 0;
    while let Some(current) = instances.get(next_index).copied() {
        instances.extend(model.class(current).subclasses.iter().copied());
        next_index += 1;
    }
    instances
}

/// Nearest definition of `name(parameter_types)` walking from `class_id`
/// towards the root.
#[must_use]
pub fn lookup_method(
    model: &ProgramModel,
    class_id: ClassId,
    name: &str,
    parameter_types: &[Type],
) -> Option<CodeId> {
    model
        .superclass_chain(class_id)
        .find_map(|current| model.method_in_class(current, name, parameter_types))
}

/// Every method a virtual call of `method` through a receiver of static
/// class `receiver_class` may reach at run time. Subclasses inheriting a
/// definition contribute that inherited definition, so the set holds at most
/// one target per instance class.
#[must_use]
pub fn virtual_call_targets(
    model: &ProgramModel,
    receiver_class: ClassId,
    method: CodeId,
) -> BTreeSet<CodeId> {
    let signature = model.code(method);
    instances(model, receiver_class)
        .into_iter()
        .filter_map(|instance| {
            lookup_method(model, instance, &signature.name, &signature.parameter_types)
        })
        .collect()
}

/// Targets of a construction call. A constructor with parameters is its only
/// target; the zero-argument constructor stands for the zero-argument
/// constructors of every instance of its class, since their implicit
/// superclass calls reach it.
#[must_use]
pub fn constructor_call_targets(model: &ProgramModel, constructor: CodeId) -> BTreeSet<CodeId> {
    let signature = model.code(constructor);
    if !signature.parameter_types.is_empty() {
        return BTreeSet::from([constructor]);
    }
    instances(model, signature.class)
        .into_iter()
        .filter_map(|instance| model.zero_argument_constructor(instance))
        .collect()
}

#[must_use]
pub fn call_targets(
    model: &ProgramModel,
    receiver_class: ClassId,
    target: CodeId,
) -> BTreeSet<CodeId> {
    match model.code(target).kind {
        CodeKind::Constructor => constructor_call_targets(model, target),
        CodeKind::Method => virtual_call_targets(model, receiver_class, target),
    }
}
