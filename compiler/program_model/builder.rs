use std::collections::BTreeMap;

use crate::{
    ArrayTypeId, ClassDeclaration, ClassId, CodeId, CodeKind, CodeSignature, Command,
    CONSTRUCTOR_NAME, FieldId, FieldSignature, OBJECT_CLASS_NAME, ProgramModel, Type,
};

/// Registry the type checker fills while registering class members. The root
/// class `Object` and its implicit empty constructor always exist.
pub struct ProgramModelBuilder {
    model: ProgramModel,
}

impl Default for ProgramModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramModelBuilder {
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self {
            model: ProgramModel {
                classes: Vec::new(),
                fields: Vec::new(),
                code: Vec::new(),
                array_element_types: Vec::new(),
            },
        };
        let object_class = builder.push_class(OBJECT_CLASS_NAME, None);
        builder.add_constructor(object_class, Vec::new());
        builder
    }

    #[must_use]
    pub fn object_class(&self) -> ClassId {
        ClassId(0)
    }

    pub fn add_class(&mut self, name: impl Into<String>, superclass: ClassId) -> ClassId {
        let class_id = self.push_class(name, Some(superclass));
        self.model.classes[superclass.index()].subclasses.push(class_id);
        class_id
    }

    fn push_class(&mut self, name: impl Into<String>, superclass: Option<ClassId>) -> ClassId {
        let class_id = ClassId(self.model.classes.len() as u32);
        self.model.classes.push(ClassDeclaration {
            name: name.into(),
            superclass,
            field_by_name: BTreeMap::new(),
            constructors: Vec::new(),
            method_overloads_by_name: BTreeMap::new(),
            subclasses: Vec::new(),
        });
        class_id
    }

    /// Returns the unique array type with the given element type.
    pub fn array_of(&mut self, element_type: Type) -> Type {
        if let Some(array_type) = self.model.array_type_of(element_type) {
            return array_type;
        }
        let array_type_id = ArrayTypeId(self.model.array_element_types.len() as u32);
        self.model.array_element_types.push(element_type);
        Type::Array(array_type_id)
    }

    pub fn add_field(
        &mut self,
        class: ClassId,
        name: impl Into<String>,
        field_type: Type,
    ) -> FieldId {
        let name = name.into();
        let field_id = FieldId(self.model.fields.len() as u32);
        self.model.fields.push(FieldSignature {
            class,
            name: name.clone(),
            field_type,
        });
        self.model.classes[class.index()]
            .field_by_name
            .insert(name, field_id);
        field_id
    }

    pub fn add_constructor(&mut self, class: ClassId, parameter_types: Vec<Type>) -> CodeId {
        let code_id = self.push_code(CodeSignature {
            kind: CodeKind::Constructor,
            class,
            name: CONSTRUCTOR_NAME.to_string(),
            parameter_types,
            return_type: Type::Void,
            body: Command::skip(),
        });
        self.model.classes[class.index()].constructors.push(code_id);
        code_id
    }

    pub fn add_method(
        &mut self,
        class: ClassId,
        name: impl Into<String>,
        parameter_types: Vec<Type>,
        return_type: Type,
    ) -> CodeId {
        let name = name.into();
        let code_id = self.push_code(CodeSignature {
            kind: CodeKind::Method,
            class,
            name: name.clone(),
            parameter_types,
            return_type,
            body: Command::skip(),
        });
        self.model.classes[class.index()]
            .method_overloads_by_name
            .entry(name)
            .or_default()
            .push(code_id);
        code_id
    }

    fn push_code(&mut self, signature: CodeSignature) -> CodeId {
        let code_id = CodeId(self.model.code.len() as u32);
        self.model.code.push(signature);
        code_id
    }

    pub fn set_body(&mut self, code: CodeId, body: Command) {
        self.model.code[code.index()].body = body;
    }

    /// Read access for code that needs types of already registered members
    /// while bodies are still being attached.
    #[must_use]
    pub fn model(&self) -> &ProgramModel {
        &self.model
    }

    #[must_use]
    pub fn finish(self) -> ProgramModel {
        self.model
    }
}
