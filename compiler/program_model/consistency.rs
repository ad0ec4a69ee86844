use compiler__reports::{CompilerFailure, CompilerFailureKind};

use crate::{
    AssignmentTarget, ClassId, CodeKind, Command, Expression, OBJECT_CLASS_NAME, ProgramModel,
    Type,
};

/// Structural checks for models that did not come out of
/// [`crate::ProgramModelBuilder`] (for example deserialized ones). Type rules
/// are the type checker's business and are not re-checked here.
pub fn check_consistency(model: &ProgramModel) -> Result<(), CompilerFailure> {
    let mut problems = Vec::new();

    if model.classes.is_empty() || model.classes[0].name != OBJECT_CLASS_NAME {
        problems.push(format!("class 0 must be the root class '{OBJECT_CLASS_NAME}'"));
    } else if model.classes[0].superclass.is_some() {
        problems.push(format!("root class '{OBJECT_CLASS_NAME}' must not have a superclass"));
    }

    for class_id in model.class_ids() {
        let class = model.class(class_id);
        if class_id != model.object_class() {
            match class.superclass {
                None => problems.push(format!("class '{}' has no superclass", class.name)),
                Some(superclass) if !class_in_range(model, superclass) => problems.push(format!(
                    "class '{}' names unknown superclass {}",
                    class.name, superclass.0
                )),
                Some(superclass) => {
                    if !model.classes[superclass.index()].subclasses.contains(&class_id) {
                        problems.push(format!(
                            "class '{}' is missing from the subclass list of '{}'",
                            class.name, model.classes[superclass.index()].name
                        ));
                    }
                }
            }
        }
        for subclass in &class.subclasses {
            if !class_in_range(model, *subclass)
                || model.classes[subclass.index()].superclass != Some(class_id)
            {
                problems.push(format!(
                    "class '{}' lists {} as a subclass that does not extend it",
                    class.name, subclass.0
                ));
            }
        }
        for field_id in class.field_by_name.values() {
            if field_id.index() >= model.fields.len()
                || model.fields[field_id.index()].class != class_id
            {
                problems.push(format!("class '{}' lists a foreign field", class.name));
            }
        }
        let declared_code = class
            .constructors
            .iter()
            .chain(class.method_overloads_by_name.values().flatten());
        for code_id in declared_code {
            if code_id.index() >= model.code.len()
                || model.code[code_id.index()].class != class_id
            {
                problems.push(format!("class '{}' lists foreign code", class.name));
            }
        }
    }

    if problems.is_empty() && has_superclass_cycle(model) {
        problems.push("superclass links contain a cycle".to_string());
    }
    if !problems.is_empty() {
        return Err(inconsistency_failure(problems));
    }

    for field_id in model.field_ids() {
        let field = model.field(field_id);
        if !class_in_range(model, field.class) || !type_in_range(model, field.field_type) {
            problems.push(format!("field '{}' refers to unknown classes or types", field.name));
        }
    }

    for code_id in model.code_ids() {
        let code = model.code(code_id);
        if !class_in_range(model, code.class) {
            problems.push(format!("code '{}' belongs to an unknown class", code.name));
            continue;
        }
        let signature_types_known = code
            .parameter_types
            .iter()
            .chain(std::iter::once(&code.return_type))
            .all(|value_type| type_in_range(model, *value_type));
        if !signature_types_known {
            problems.push(format!("code '{}' refers to unknown types", code.name));
            continue;
        }
        if code.kind == CodeKind::Constructor && code.return_type != Type::Void {
            problems.push(format!(
                "constructor of '{}' must return void",
                model.class(code.class).name
            ));
        }
        let mut body_problems = Vec::new();
        check_command(model, &code.body, &mut body_problems);
        for problem in body_problems {
            problems.push(format!("{} {problem}", model.describe_code(code_id)));
        }
    }

    if problems.is_empty() {
        return Ok(());
    }
    Err(inconsistency_failure(problems))
}

fn inconsistency_failure(problems: Vec<String>) -> CompilerFailure {
    let mut failure = CompilerFailure::new(
        CompilerFailureKind::InvalidProgramModel,
        format!("program model is inconsistent ({} problems)", problems.len()),
    );
    for problem in problems {
        failure = failure.with_detail(problem);
    }
    failure
}

fn class_in_range(model: &ProgramModel, class_id: ClassId) -> bool {
    class_id.index() < model.classes.len()
}

fn type_in_range(model: &ProgramModel, value_type: Type) -> bool {
    match value_type {
        Type::Class(class_id) => class_in_range(model, class_id),
        Type::Array(array_type_id) => array_type_id.index() < model.array_element_types.len(),
        _ => true,
    }
}

fn has_superclass_cycle(model: &ProgramModel) -> bool {
    model.class_ids().any(|class_id| {
        model
            .superclass_chain(class_id)
            .nth(model.classes.len())
            .is_some()
    })
}

fn check_command(model: &ProgramModel, command: &Command, problems: &mut Vec<String>) {
    match command {
        Command::Skip { .. } => {}
        Command::LocalDeclaration {
            variable_type,
            initializer,
            ..
        } => {
            check_type(model, *variable_type, problems);
            check_expression(model, initializer, problems);
        }
        Command::Assignment { target, value, .. } => {
            match target {
                AssignmentTarget::Variable { variable_type, .. } => {
                    check_type(model, *variable_type, problems);
                }
                AssignmentTarget::Field { receiver, field } => {
                    check_expression(model, receiver, problems);
                    check_field(model, field.index(), problems);
                }
                AssignmentTarget::ArrayElement {
                    array,
                    index,
                    element_type,
                } => {
                    check_expression(model, array, problems);
                    check_expression(model, index, problems);
                    check_type(model, *element_type, problems);
                }
            }
            check_expression(model, value, problems);
        }
        Command::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            check_expression(model, condition, problems);
            check_command(model, then_branch, problems);
            check_command(model, else_branch, problems);
        }
        Command::While {
            condition, body, ..
        } => {
            check_expression(model, condition, problems);
            check_command(model, body, problems);
        }
        Command::For {
            initialization,
            condition,
            update,
            body,
            ..
        } => {
            check_command(model, initialization, problems);
            check_expression(model, condition, problems);
            check_command(model, update, problems);
            check_command(model, body, problems);
        }
        Command::Block { commands, .. } => {
            for nested in commands {
                check_command(model, nested, problems);
            }
        }
        Command::Return { value, .. } => {
            if let Some(value) = value {
                check_expression(model, value, problems);
            }
        }
        Command::MethodCall {
            receiver,
            receiver_class,
            method,
            arguments,
            ..
        } => {
            check_expression(model, receiver, problems);
            check_call(model, *receiver_class, method.index(), CodeKind::Method, problems);
            for argument in arguments {
                check_expression(model, argument, problems);
            }
        }
    }
}

fn check_expression(model: &ProgramModel, expression: &Expression, problems: &mut Vec<String>) {
    match expression {
        Expression::Literal { .. } => {}
        Expression::Variable { variable_type, .. } => check_type(model, *variable_type, problems),
        Expression::FieldAccess {
            receiver, field, ..
        } => {
            check_expression(model, receiver, problems);
            check_field(model, field.index(), problems);
        }
        Expression::ArrayElement {
            array,
            index,
            element_type,
            ..
        } => {
            check_expression(model, array, problems);
            check_expression(model, index, problems);
            check_type(model, *element_type, problems);
        }
        Expression::ArrayLength { array, .. } => check_expression(model, array, problems),
        Expression::Binary {
            left,
            right,
            operand_type,
            ..
        } => {
            check_expression(model, left, problems);
            check_expression(model, right, problems);
            check_type(model, *operand_type, problems);
        }
        Expression::Unary {
            operand,
            operand_type,
            ..
        } => {
            check_expression(model, operand, problems);
            check_type(model, *operand_type, problems);
        }
        Expression::Cast {
            expression,
            from,
            into,
            ..
        } => {
            check_expression(model, expression, problems);
            check_type(model, *from, problems);
            check_type(model, *into, problems);
        }
        Expression::NewObject {
            class,
            constructor,
            arguments,
            ..
        } => {
            check_call(model, *class, constructor.index(), CodeKind::Constructor, problems);
            for argument in arguments {
                check_expression(model, argument, problems);
            }
        }
        Expression::NewArray {
            array_type, size, ..
        } => {
            if !matches!(array_type, Type::Array(_)) {
                problems.push("allocates an array of a non-array type".to_string());
            }
            check_type(model, *array_type, problems);
            check_expression(model, size, problems);
        }
        Expression::MethodCall {
            receiver,
            receiver_class,
            method,
            arguments,
            ..
        } => {
            check_expression(model, receiver, problems);
            check_call(model, *receiver_class, method.index(), CodeKind::Method, problems);
            if model
                .code
                .get(method.index())
                .is_some_and(|code| code.return_type == Type::Void)
            {
                problems.push(format!(
                    "uses the result of void method '{}'",
                    model.code[method.index()].name
                ));
            }
            for argument in arguments {
                check_expression(model, argument, problems);
            }
        }
    }
}

fn check_type(model: &ProgramModel, value_type: Type, problems: &mut Vec<String>) {
    if !type_in_range(model, value_type) {
        problems.push(format!("refers to unknown type {value_type:?}"));
    }
}

fn check_field(model: &ProgramModel, field_index: usize, problems: &mut Vec<String>) {
    if field_index >= model.fields.len() {
        problems.push(format!("refers to unknown field {field_index}"));
    }
}

fn check_call(
    model: &ProgramModel,
    class_id: ClassId,
    code_index: usize,
    expected_kind: CodeKind,
    problems: &mut Vec<String>,
) {
    if !class_in_range(model, class_id) {
        problems.push(format!("calls into unknown class {}", class_id.0));
        return;
    }
    let Some(code) = model.code.get(code_index) else {
        problems.push(format!("calls unknown code {code_index}"));
        return;
    };
    if code.kind != expected_kind {
        problems.push(format!("calls '{}' with the wrong call kind", code.name));
    } else if class_in_range(model, code.class) && !model.is_subclass_of(class_id, code.class) {
        problems.push(format!(
            "calls '{}' through class '{}' which does not inherit it",
            code.name,
            model.class(class_id).name
        ));
    }
}
