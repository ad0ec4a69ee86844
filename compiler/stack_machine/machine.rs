use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use compiler__reports::CompilerFailure;
use compiler__stack_assembly::{
    AssembledClass, AssembledMember, AssembledProgram, AssemblyInstruction, Condition,
    MemberReference, Operation, ValueKind,
};
use tracing::trace;

use crate::run_failed;
use crate::values::{HeapEntry, RuntimeValue, parameter_count};

/// Frames a single execution may stack up before it is aborted.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Elements a single array may hold; longer allocations fail the run.
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

pub(crate) enum RuntimeExecutionError {
    NilDereference,
    IndexOutOfBounds { index: i32, length: usize },
    NegativeArrayLength(i32),
    ArrayTooLarge(usize),
    DivisionByZero,
    FailedCast { from: String, into: String },
    UnlinkedMember(String),
    CallDepthExceeded,
    InvalidProgram(String),
}

impl fmt::Display for RuntimeExecutionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NilDereference => formatter.write_str("nil dereference"),
            Self::IndexOutOfBounds { index, length } => {
                write!(formatter, "index {index} out of bounds for length {length}")
            }
            Self::NegativeArrayLength(length) => {
                write!(formatter, "negative array length {length}")
            }
            Self::ArrayTooLarge(length) => write!(
                formatter,
                "array length {length} exceeds the maximum of {MAX_ARRAY_LENGTH}"
            ),
            Self::DivisionByZero => formatter.write_str("division by zero"),
            Self::FailedCast { from, into } => write!(formatter, "cannot cast {from} to {into}"),
            Self::UnlinkedMember(member) => write!(formatter, "unlinked member {member}"),
            Self::CallDepthExceeded => {
                write!(formatter, "call depth exceeded {MAX_CALL_DEPTH} frames")
            }
            Self::InvalidProgram(message) => formatter.write_str(message),
        }
    }
}

impl RuntimeExecutionError {
    pub(crate) fn into_failure(self, member: Option<String>) -> CompilerFailure {
        let failure = run_failed(self.to_string());
        match member {
            Some(member) => failure.in_member(member),
            None => failure,
        }
    }
}

struct Frame<'a> {
    owner: &'a str,
    member: &'a AssembledMember,
    locals: Vec<RuntimeValue>,
    stack: Vec<RuntimeValue>,
    pc: usize,
}

enum Step<'a> {
    Continue,
    Call(Frame<'a>),
    Return(Option<RuntimeValue>),
}

type StepResult<T> = Result<T, RuntimeExecutionError>;

impl<'a> Frame<'a> {
    fn new(owner: &'a str, member: &'a AssembledMember, arguments: Vec<RuntimeValue>) -> Self {
        let mut locals = arguments;
        let max_locals = usize::from(member.max_locals).max(locals.len());
        locals.resize(max_locals, RuntimeValue::Null);
        Self {
            owner,
            member,
            locals,
            stack: Vec::new(),
            pc: 0,
        }
    }

    fn describe(&self) -> String {
        format!("{}.{}{}", self.owner, self.member.name, self.member.descriptor)
    }

    fn pop(&mut self) -> StepResult<RuntimeValue> {
        self.stack.pop().ok_or_else(|| {
            RuntimeExecutionError::InvalidProgram("operand stack underflow".to_string())
        })
    }

    fn pop_int(&mut self) -> StepResult<i32> {
        match self.pop()? {
            RuntimeValue::Int(value) => Ok(value),
            other => Err(mismatch("int", &other)),
        }
    }

    fn pop_float(&mut self) -> StepResult<f32> {
        match self.pop()? {
            RuntimeValue::Float(value) => Ok(value),
            other => Err(mismatch("float", &other)),
        }
    }

    /// Pops a heap reference, rejecting nil.
    fn pop_reference(&mut self) -> StepResult<usize> {
        match self.pop()? {
            RuntimeValue::Reference(reference) => Ok(reference),
            RuntimeValue::Null => Err(RuntimeExecutionError::NilDereference),
            other => Err(mismatch("reference", &other)),
        }
    }

    fn local(&mut self, slot: u16) -> StepResult<&mut RuntimeValue> {
        self.locals.get_mut(usize::from(slot)).ok_or_else(|| {
            RuntimeExecutionError::InvalidProgram(format!("local slot {slot} out of range"))
        })
    }
}

fn mismatch(expected: &str, found: &RuntimeValue) -> RuntimeExecutionError {
    RuntimeExecutionError::InvalidProgram(format!(
        "expected {expected} operand but found {}",
        found.kind_name()
    ))
}

pub(crate) struct Machine<'a> {
    class_by_name: BTreeMap<&'a str, &'a AssembledClass>,
    heap: Vec<HeapEntry>,
}

impl<'a> Machine<'a> {
    pub(crate) fn new(program: &'a AssembledProgram) -> Self {
        let class_by_name = program
            .classes
            .iter()
            .map(|class| (class.name.as_str(), class))
            .collect();
        Self {
            class_by_name,
            heap: Vec::new(),
        }
    }

    pub(crate) fn heap_entry(&self, reference: usize) -> Option<&HeapEntry> {
        self.heap.get(reference)
    }

    fn class(&self, name: &str) -> StepResult<&'a AssembledClass> {
        self.class_by_name
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeExecutionError::UnlinkedMember(format!("class {name}")))
    }

    fn superclass_chain(&self, name: &str) -> impl Iterator<Item = &'a AssembledClass> + '_ {
        let mut next = self.class_by_name.get(name).copied();
        std::iter::from_fn(move || {
            let class = next?;
            next = class
                .superclass
                .as_deref()
                .and_then(|superclass| self.class_by_name.get(superclass).copied());
            Some(class)
        })
    }

    fn is_subclass_of(&self, class: &str, ancestor: &str) -> bool {
        self.superclass_chain(class)
            .any(|candidate| candidate.name == ancestor)
    }

    pub(crate) fn constructor(
        &self,
        owner: &str,
        descriptor: &str,
    ) -> StepResult<(&'a str, &'a AssembledMember)> {
        let class = self.class(owner)?;
        class
            .constructor(descriptor)
            .map(|constructor| (class.name.as_str(), constructor))
            .ok_or_else(|| {
                RuntimeExecutionError::UnlinkedMember(format!("{owner}.<init>{descriptor}"))
            })
    }

    /// Most specific method named `name` with `descriptor`, looked up from
    /// `class` towards the root.
    pub(crate) fn resolve_virtual(
        &self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> StepResult<(&'a str, &'a AssembledMember)> {
        self.superclass_chain(class)
            .find_map(|candidate| {
                candidate
                    .method(name, descriptor)
                    .map(|method| (candidate.name.as_str(), method))
            })
            .ok_or_else(|| {
                RuntimeExecutionError::UnlinkedMember(format!("{class}.{name}{descriptor}"))
            })
    }

    pub(crate) fn instantiate(&mut self, class_name: &str) -> StepResult<RuntimeValue> {
        let class = self.class(class_name)?;
        let field_value_by_key = self
            .superclass_chain(&class.name)
            .flat_map(|class| {
                class.fields.iter().map(|field| {
                    (
                        (class.name.clone(), field.name.clone()),
                        RuntimeValue::default_for(&field.descriptor),
                    )
                })
            })
            .collect();
        self.heap.push(HeapEntry::Object {
            class: class.name.clone(),
            field_value_by_key,
        });
        Ok(RuntimeValue::Reference(self.heap.len() - 1))
    }

    fn object_class(&self, reference: usize) -> StepResult<&str> {
        match self.heap.get(reference) {
            Some(HeapEntry::Object { class, .. }) => Ok(class),
            _ => Err(RuntimeExecutionError::InvalidProgram(
                "expected an object reference".to_string(),
            )),
        }
    }

    fn field_slot(
        &mut self,
        reference: usize,
        field: &MemberReference,
    ) -> StepResult<&mut RuntimeValue> {
        let Some(HeapEntry::Object {
            class,
            field_value_by_key,
        }) = self.heap.get_mut(reference)
        else {
            return Err(RuntimeExecutionError::InvalidProgram(
                "expected an object reference".to_string(),
            ));
        };
        let key = (field.owner.clone(), field.name.clone());
        let class = class.clone();
        field_value_by_key.get_mut(&key).ok_or_else(|| {
            RuntimeExecutionError::InvalidProgram(format!(
                "object of class {class} has no field {}.{}",
                field.owner, field.name
            ))
        })
    }

    fn array_elements(&mut self, reference: usize) -> StepResult<&mut Vec<RuntimeValue>> {
        match self.heap.get_mut(reference) {
            Some(HeapEntry::Array { elements }) => Ok(elements),
            _ => Err(RuntimeExecutionError::InvalidProgram(
                "expected an array reference".to_string(),
            )),
        }
    }

    /// Runs `member` to completion with `arguments` in its first local slots.
    pub(crate) fn invoke(
        &mut self,
        owner: &'a str,
        member: &'a AssembledMember,
        arguments: Vec<RuntimeValue>,
    ) -> Result<Option<RuntimeValue>, CompilerFailure> {
        let mut frames = vec![Frame::new(owner, member, arguments)];
        while let Some(frame) = frames.last_mut() {
            let step = self
                .step(frame)
                .map_err(|error| error.into_failure(Some(frame.describe())))?;
            match step {
                Step::Continue => {}
                Step::Call(callee) => {
                    if frames.len() >= MAX_CALL_DEPTH {
                        return Err(RuntimeExecutionError::CallDepthExceeded
                            .into_failure(Some(callee.describe())));
                    }
                    trace!(member = %callee.describe(), depth = frames.len(), "invoked member");
                    frames.push(callee);
                }
                Step::Return(value) => {
                    frames.pop();
                    match frames.last_mut() {
                        None => return Ok(value),
                        Some(caller) => caller.stack.extend(value),
                    }
                }
            }
        }
        Ok(None)
    }

    fn step(&mut self, frame: &mut Frame<'a>) -> StepResult<Step<'a>> {
        let member = frame.member;
        let instruction = member.instructions.get(frame.pc).ok_or_else(|| {
            RuntimeExecutionError::InvalidProgram(format!(
                "execution ran past instruction {}",
                frame.pc
            ))
        })?;
        let mut next = frame.pc + 1;

        match instruction {
            AssemblyInstruction::Nop => {}
            AssemblyInstruction::PushInt { value } => frame.stack.push(RuntimeValue::Int(*value)),
            AssemblyInstruction::PushFloat { value } => {
                frame.stack.push(RuntimeValue::Float(*value));
            }
            AssemblyInstruction::PushString { value } => {
                frame.stack.push(RuntimeValue::String(Rc::from(value.as_str())));
            }
            AssemblyInstruction::PushNull => frame.stack.push(RuntimeValue::Null),
            AssemblyInstruction::Load { slot, .. } => {
                let value = frame.local(*slot)?.clone();
                frame.stack.push(value);
            }
            AssemblyInstruction::Store { slot, .. } => {
                let value = frame.pop()?;
                *frame.local(*slot)? = value;
            }
            AssemblyInstruction::GetField { field } => {
                let receiver = frame.pop_reference()?;
                let value = self.field_slot(receiver, field)?.clone();
                frame.stack.push(value);
            }
            AssemblyInstruction::PutField { field } => {
                let value = frame.pop()?;
                let receiver = frame.pop_reference()?;
                *self.field_slot(receiver, field)? = value;
            }
            AssemblyInstruction::ArrayLoad { .. } => {
                let index = frame.pop_int()?;
                let array = frame.pop_reference()?;
                let elements = self.array_elements(array)?;
                let value = element_index(index, elements.len())
                    .map(|position| elements[position].clone())?;
                frame.stack.push(value);
            }
            AssemblyInstruction::ArrayStore { .. } => {
                let value = frame.pop()?;
                let index = frame.pop_int()?;
                let array = frame.pop_reference()?;
                let elements = self.array_elements(array)?;
                let position = element_index(index, elements.len())?;
                elements[position] = value;
            }
            AssemblyInstruction::ArrayLength => {
                let array = frame.pop_reference()?;
                let length = self.array_elements(array)?.len();
                frame
                    .stack
                    .push(RuntimeValue::Int(i32::try_from(length).unwrap_or(i32::MAX)));
            }
            AssemblyInstruction::New { class } => {
                let object = self.instantiate(class)?;
                frame.stack.push(object);
            }
            AssemblyInstruction::NewArray { element_descriptor } => {
                let length = frame.pop_int()?;
                let length = usize::try_from(length)
                    .map_err(|_| RuntimeExecutionError::NegativeArrayLength(length))?;
                if length > MAX_ARRAY_LENGTH {
                    return Err(RuntimeExecutionError::ArrayTooLarge(length));
                }
                self.heap.push(HeapEntry::Array {
                    elements: vec![RuntimeValue::default_for(element_descriptor); length],
                });
                frame.stack.push(RuntimeValue::Reference(self.heap.len() - 1));
            }
            AssemblyInstruction::Arithmetic { kind, operation } => {
                let value = match kind {
                    ValueKind::Int => {
                        let right = frame.pop_int()?;
                        let left = frame.pop_int()?;
                        RuntimeValue::Int(int_arithmetic(*operation, left, right)?)
                    }
                    ValueKind::Float => {
                        let right = frame.pop_float()?;
                        let left = frame.pop_float()?;
                        RuntimeValue::Float(float_arithmetic(*operation, left, right))
                    }
                    ValueKind::Reference => {
                        return Err(RuntimeExecutionError::InvalidProgram(
                            "arithmetic on references".to_string(),
                        ));
                    }
                };
                frame.stack.push(value);
            }
            AssemblyInstruction::Negate { kind } => {
                let value = match kind {
                    ValueKind::Int => RuntimeValue::Int(frame.pop_int()?.wrapping_neg()),
                    ValueKind::Float => RuntimeValue::Float(-frame.pop_float()?),
                    ValueKind::Reference => {
                        return Err(RuntimeExecutionError::InvalidProgram(
                            "negation of a reference".to_string(),
                        ));
                    }
                };
                frame.stack.push(value);
            }
            AssemblyInstruction::Convert { from, into } => {
                let value = frame.pop()?;
                frame.stack.push(convert(value, *from, *into)?);
            }
            AssemblyInstruction::CheckCast { class } => {
                let value = frame.pop()?;
                if let RuntimeValue::Reference(reference) = value {
                    let runtime_class = self.object_class(reference)?;
                    if !self.is_subclass_of(runtime_class, class) {
                        return Err(RuntimeExecutionError::FailedCast {
                            from: runtime_class.to_string(),
                            into: class.clone(),
                        });
                    }
                } else if value != RuntimeValue::Null {
                    return Err(RuntimeExecutionError::FailedCast {
                        from: value.kind_name().to_string(),
                        into: class.clone(),
                    });
                }
                frame.stack.push(value);
            }
            AssemblyInstruction::FloatCompare { nan_is_greater } => {
                let right = frame.pop_float()?;
                let left = frame.pop_float()?;
                let outcome = match left.partial_cmp(&right) {
                    Some(ordering) => ordering as i32,
                    None if *nan_is_greater => 1,
                    None => -1,
                };
                frame.stack.push(RuntimeValue::Int(outcome));
            }
            AssemblyInstruction::Dup => {
                let value = frame.pop()?;
                frame.stack.push(value.clone());
                frame.stack.push(value);
            }
            AssemblyInstruction::Pop => {
                frame.pop()?;
            }
            AssemblyInstruction::InvokeSpecial { member }
            | AssemblyInstruction::InvokeVirtual { member } => {
                let count = parameter_count(&member.descriptor).ok_or_else(|| {
                    RuntimeExecutionError::InvalidProgram(format!(
                        "malformed descriptor {}",
                        member.descriptor
                    ))
                })?;
                if frame.stack.len() <= count {
                    return Err(RuntimeExecutionError::InvalidProgram(
                        "operand stack underflow".to_string(),
                    ));
                }
                let arguments = frame.stack.split_off(frame.stack.len() - count - 1);
                let receiver = match arguments[0] {
                    RuntimeValue::Reference(reference) => reference,
                    RuntimeValue::Null => return Err(RuntimeExecutionError::NilDereference),
                    ref other => return Err(mismatch("reference", other)),
                };
                let (owner, callee) =
                    if matches!(instruction, AssemblyInstruction::InvokeSpecial { .. }) {
                        self.constructor(&member.owner, &member.descriptor)?
                    } else {
                        let runtime_class = self.object_class(receiver)?;
                        self.resolve_virtual(runtime_class, &member.name, &member.descriptor)?
                    };
                frame.pc = next;
                return Ok(Step::Call(Frame::new(owner, callee, arguments)));
            }
            AssemblyInstruction::If { condition, target } => {
                let value = frame.pop_int()?;
                if condition.holds(value.cmp(&0)) {
                    next = *target;
                }
            }
            AssemblyInstruction::IfCompare {
                kind,
                condition,
                target,
            } => {
                let right = frame.pop()?;
                let left = frame.pop()?;
                if compare(*kind, *condition, &left, &right)? {
                    next = *target;
                }
            }
            AssemblyInstruction::Goto { target } => next = *target,
            AssemblyInstruction::Return => return Ok(Step::Return(None)),
            AssemblyInstruction::ReturnValue { .. } => {
                return Ok(Step::Return(Some(frame.pop()?)));
            }
        }

        frame.pc = next;
        Ok(Step::Continue)
    }
}

fn element_index(index: i32, length: usize) -> StepResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|position| *position < length)
        .ok_or(RuntimeExecutionError::IndexOutOfBounds { index, length })
}

fn int_arithmetic(operation: Operation, left: i32, right: i32) -> StepResult<i32> {
    Ok(match operation {
        Operation::Add => left.wrapping_add(right),
        Operation::Sub => left.wrapping_sub(right),
        Operation::Mul => left.wrapping_mul(right),
        Operation::Div | Operation::Rem if right == 0 => {
            return Err(RuntimeExecutionError::DivisionByZero);
        }
        Operation::Div => left.wrapping_div(right),
        Operation::Rem => left.wrapping_rem(right),
    })
}

fn float_arithmetic(operation: Operation, left: f32, right: f32) -> f32 {
    match operation {
        Operation::Add => left + right,
        Operation::Sub => left - right,
        Operation::Mul => left * right,
        Operation::Div => left / right,
        Operation::Rem => left % right,
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn convert(value: RuntimeValue, from: ValueKind, into: ValueKind) -> StepResult<RuntimeValue> {
    match (value, from, into) {
        (RuntimeValue::Int(value), ValueKind::Int, ValueKind::Float) => {
            Ok(RuntimeValue::Float(value as f32))
        }
        (RuntimeValue::Float(value), ValueKind::Float, ValueKind::Int) => {
            Ok(RuntimeValue::Int(value as i32))
        }
        (value, _, _) => Err(RuntimeExecutionError::InvalidProgram(format!(
            "cannot convert {} from {} to {}",
            value.kind_name(),
            from.prefix(),
            into.prefix()
        ))),
    }
}

fn compare(
    kind: ValueKind,
    condition: Condition,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> StepResult<bool> {
    match (kind, left, right) {
        (ValueKind::Int, RuntimeValue::Int(left), RuntimeValue::Int(right)) => {
            Ok(condition.holds(left.cmp(right)))
        }
        (ValueKind::Float, RuntimeValue::Float(left), RuntimeValue::Float(right)) => Ok(left
            .partial_cmp(right)
            .is_some_and(|ordering| condition.holds(ordering))),
        (ValueKind::Reference, _, _) => {
            let same = match (left, right) {
                (RuntimeValue::Null, RuntimeValue::Null) => true,
                (RuntimeValue::Reference(left), RuntimeValue::Reference(right)) => left == right,
                (RuntimeValue::String(left), RuntimeValue::String(right)) => left == right,
                _ => false,
            };
            match condition {
                Condition::Eq => Ok(same),
                Condition::Ne => Ok(!same),
                _ => Err(RuntimeExecutionError::InvalidProgram(
                    "references cannot be ordered".to_string(),
                )),
            }
        }
        (_, left, _) => Err(mismatch(kind.prefix(), left)),
    }
}
