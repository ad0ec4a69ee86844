use compiler__program_model::{ProgramModel, Type};

use crate::{Branching, CallSite, Constant, Final, Instruction, Sequential};

impl Sequential {
    #[must_use]
    pub fn describe(&self, model: &ProgramModel) -> String {
        match self {
            Sequential::Nop => "nop".to_string(),
            Sequential::Constant(constant) => format!("const {}", describe_constant(constant)),
            Sequential::Load { slot, value_type } => {
                format!("load {slot} of type {}", model.describe_type(*value_type))
            }
            Sequential::Store { slot, value_type } => {
                format!("store {slot} of type {}", model.describe_type(*value_type))
            }
            Sequential::GetField { field, .. } => {
                format!("getfield {}", model.describe_field(*field))
            }
            Sequential::PutField { field, .. } => {
                format!("putfield {}", model.describe_field(*field))
            }
            Sequential::ArrayLoad { element_type } => {
                format!("arrayload {}", model.describe_type(*element_type))
            }
            Sequential::ArrayStore { element_type } => {
                format!("arraystore {}", model.describe_type(*element_type))
            }
            Sequential::ArrayLength => "arraylength".to_string(),
            Sequential::NewObject { class } => format!("new {}", model.class(*class).name),
            Sequential::NewArray { element_type, .. } => {
                format!("newarray {}", model.describe_type(*element_type))
            }
            Sequential::Arithmetic {
                operator,
                operand_type,
            } => format!(
                "{} {}",
                operator.mnemonic(),
                model.describe_type(*operand_type)
            ),
            Sequential::Negate { operand_type } => {
                format!("neg {}", model.describe_type(*operand_type))
            }
            Sequential::Compare {
                comparison,
                operand_type,
            } => format!(
                "cmp{} {}",
                comparison.mnemonic(),
                model.describe_type(*operand_type)
            ),
            Sequential::Convert { from, into } => format!(
                "cast {} into {}",
                model.describe_type(*from),
                model.describe_type(*into)
            ),
            Sequential::CheckCast { class } => format!("checkcast {}", model.class(*class).name),
            Sequential::Dup { value_type } => format!("dup {}", model.describe_type(*value_type)),
            Sequential::Pop { value_type } => format!("pop {}", model.describe_type(*value_type)),
            Sequential::ConstructorCall(call_site) => {
                format!("constructorcall {}", describe_call_site(model, call_site))
            }
            Sequential::VirtualCall(call_site) => {
                format!("virtualcall {}", describe_call_site(model, call_site))
            }
        }
    }
}

impl Branching {
    #[must_use]
    pub fn describe(&self, model: &ProgramModel) -> String {
        match self {
            Branching::IfTrue => "if_true".to_string(),
            Branching::IfFalse => "if_false".to_string(),
            Branching::IfCompare {
                comparison,
                operand_type,
                unordered_holds,
            } => {
                let unordered = if *operand_type == Type::Float && *unordered_holds {
                    " or unordered"
                } else {
                    ""
                };
                format!(
                    "if_cmp{} {}{unordered}",
                    comparison.mnemonic(),
                    model.describe_type(*operand_type)
                )
            }
        }
    }
}

impl Final {
    #[must_use]
    pub fn describe(&self, model: &ProgramModel) -> String {
        match self {
            Final::Return => "return".to_string(),
            Final::ReturnValue { value_type } => {
                format!("return {}", model.describe_type(*value_type))
            }
        }
    }
}

impl Instruction<Sequential> {
    #[must_use]
    pub fn describe(&self, model: &ProgramModel) -> String {
        self.kind.describe(model)
    }
}

impl Instruction<Branching> {
    #[must_use]
    pub fn describe(&self, model: &ProgramModel) -> String {
        self.kind.describe(model)
    }
}

impl Instruction<Final> {
    #[must_use]
    pub fn describe(&self, model: &ProgramModel) -> String {
        self.kind.describe(model)
    }
}

fn describe_constant(constant: &Constant) -> String {
    match constant {
        Constant::Int(value) => value.to_string(),
        Constant::Float(bits) => format!("{:?}", f32::from_bits(*bits)),
        Constant::Boolean(value) => value.to_string(),
        Constant::Nil => "nil".to_string(),
        Constant::String(value) => format!("{value:?}"),
    }
}

fn describe_call_site(model: &ProgramModel, call_site: &CallSite) -> String {
    format!(
        "{} via {}",
        model.describe_code(call_site.target),
        model.class(call_site.static_receiver).name
    )
}
