// src/frontend/ast.rs
//! Package AST handed over by the parser.
//!
//! Nodes carry no source positions; lowering never consults them. Every node
//! is serde-serializable so a package can cross a process boundary as JSON.

use serde::{Deserialize, Serialize};

/// A complete compiled unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub public_functions: Vec<FnDecl>,
    #[serde(default)]
    pub private_functions: Vec<FnDecl>,
    #[serde(default)]
    pub public_types: Vec<TypeDecl>,
    #[serde(default)]
    pub private_types: Vec<TypeDecl>,
    #[serde(default)]
    pub public_variables: Vec<VarDecl>,
    #[serde(default)]
    pub private_variables: Vec<VarDecl>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Functions in driver order: private first, then public.
    pub fn functions(&self) -> impl Iterator<Item = &FnDecl> {
        self.private_functions
            .iter()
            .chain(self.public_functions.iter())
    }

    /// Type declarations in driver order: private first, then public.
    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.private_types.iter().chain(self.public_types.iter())
    }

    /// Package variables in driver order: private first, then public.
    pub fn variables(&self) -> impl Iterator<Item = &VarDecl> {
        self.private_variables
            .iter()
            .chain(self.public_variables.iter())
    }

    /// Look up a type declaration by name, private declarations first.
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types().find(|decl| decl.name == name)
    }

    /// Add a function to the list matching its visibility.
    pub fn push_function(&mut self, func: FnDecl) {
        if func.public {
            self.public_functions.push(func);
        } else {
            self.private_functions.push(func);
        }
    }

    /// Add a type declaration to the list matching its visibility.
    pub fn push_type(&mut self, decl: TypeDecl) {
        if decl.public {
            self.public_types.push(decl);
        } else {
            self.private_types.push(decl);
        }
    }

    /// Add a package variable declaration to the list matching its visibility.
    pub fn push_variable(&mut self, decl: VarDecl) {
        if decl.public {
            self.public_variables.push(decl);
        } else {
            self.private_variables.push(decl);
        }
    }
}

/// `type Name <type-expr>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    #[serde(default)]
    pub public: bool,
    pub name: String,
    pub ty: TypeExpr,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            public: false,
            name: name.into(),
            ty,
        }
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn as_interface(&self) -> Option<&InterfaceTypeExpr> {
        match &self.ty {
            TypeExpr::Interface(iface) => Some(iface),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructTypeExpr> {
        match &self.ty {
            TypeExpr::Struct(s) => Some(s),
            _ => None,
        }
    }
}

/// Type expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExpr {
    Primitive(PrimitiveType),
    Pointer(Box<TypeExpr>),
    Struct(StructTypeExpr),
    Interface(InterfaceTypeExpr),
    /// Reference to another declared type by name
    Named(String),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    pub fn pointer(to: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(to))
    }

    pub fn void() -> Self {
        TypeExpr::Primitive(PrimitiveType::Void)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeExpr::Primitive(PrimitiveType::Void))
    }
}

impl From<PrimitiveType> for TypeExpr {
    fn from(prim: PrimitiveType) -> Self {
        TypeExpr::Primitive(prim)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Void,
}

impl PrimitiveType {
    /// Bit width of the value representation. Void has none.
    pub fn bits(self) -> u32 {
        match self {
            PrimitiveType::I8 | PrimitiveType::U8 => 8,
            PrimitiveType::I16 | PrimitiveType::U16 => 16,
            PrimitiveType::I32 | PrimitiveType::U32 | PrimitiveType::F32 => 32,
            PrimitiveType::I64 | PrimitiveType::U64 | PrimitiveType::F64 => 64,
            PrimitiveType::Bool => 1,
            PrimitiveType::Void => 0,
        }
    }

    /// Floats count as signed, matching the arithmetic they lower to.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveType::I8
                | PrimitiveType::I16
                | PrimitiveType::I32
                | PrimitiveType::I64
                | PrimitiveType::F32
                | PrimitiveType::F64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveType::F32 | PrimitiveType::F64)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::I8 => "i8",
            PrimitiveType::I16 => "i16",
            PrimitiveType::I32 => "i32",
            PrimitiveType::I64 => "i64",
            PrimitiveType::U8 => "u8",
            PrimitiveType::U16 => "u16",
            PrimitiveType::U32 => "u32",
            PrimitiveType::U64 => "u64",
            PrimitiveType::F32 => "f32",
            PrimitiveType::F64 => "f64",
            PrimitiveType::Bool => "bool",
            PrimitiveType::Void => "void",
        }
    }
}

/// `struct { ... }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructTypeExpr {
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl StructTypeExpr {
    /// Field names with their types, multi-name properties expanded in place.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &TypeExpr)> {
        self.properties
            .iter()
            .flat_map(|p| p.names.iter().map(move |n| (n.as_str(), &p.ty)))
    }
}

/// One struct property node; may declare several same-typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub mutable: bool,
    pub ty: TypeExpr,
    pub names: Vec<String>,
}

impl Property {
    pub fn new<I, S>(ty: impl Into<TypeExpr>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            public: false,
            mutable: true,
            ty: ty.into(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// `interface { ... }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceTypeExpr {
    #[serde(default)]
    pub methods: Vec<Method>,
}

/// Interface method signature; never has a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    #[serde(default)]
    pub public: bool,
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    pub return_type: TypeExpr,
}

impl Method {
    pub fn new(name: impl Into<String>, return_type: impl Into<TypeExpr>) -> Self {
        Self {
            public: false,
            name: name.into(),
            params: Vec::new(),
            return_type: return_type.into(),
        }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub mutable: bool,
    pub ty: TypeExpr,
    pub name: String,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        Self {
            mutable: false,
            ty: ty.into(),
            name: name.into(),
        }
    }

    pub fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }
}

/// Receiver of a method: `(binder Type)` or `(binder *Type)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub ty: TypeExpr,
    pub binder: String,
}

/// Function declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDecl {
    #[serde(default)]
    pub public: bool,
    pub name: String,
    #[serde(default)]
    pub receiver: Option<Receiver>,
    #[serde(default)]
    pub params: Vec<Param>,
    /// Absent means void
    #[serde(default)]
    pub return_type: Option<TypeExpr>,
    /// Absent means an external declaration (e.g. `malloc`)
    #[serde(default)]
    pub body: Option<Block>,
}

impl FnDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            public: false,
            name: name.into(),
            receiver: None,
            params: Vec::new(),
            return_type: None,
            body: Some(Block::default()),
        }
    }

    /// A method with a pointer receiver `(binder *struct_name)`.
    pub fn method(
        struct_name: impl Into<String>,
        binder: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let mut func = Self::new(name);
        func.receiver = Some(Receiver {
            ty: TypeExpr::pointer(TypeExpr::named(struct_name)),
            binder: binder.into(),
        });
        func
    }

    /// A function with no body.
    pub fn external(name: impl Into<String>) -> Self {
        let mut func = Self::new(name);
        func.body = None;
        func
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, ty: impl Into<TypeExpr>) -> Self {
        self.return_type = Some(ty.into());
        self
    }

    pub fn body(mut self, stmts: Vec<Stmt>) -> Self {
        self.body = Some(Block { stmts });
        self
    }

    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }

    /// Declared return type, void when absent.
    pub fn return_type_or_void(&self) -> TypeExpr {
        self.return_type.clone().unwrap_or_else(TypeExpr::void)
    }
}

/// Block of statements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub stmts: Vec<Stmt>,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    VarDecl(VarDecl),
    Return(Option<Expr>),
    Block(Block),
    If(Box<IfStmt>),
    Expr(Expr),
}

impl Stmt {
    pub fn ret(value: Expr) -> Self {
        Stmt::Return(Some(value))
    }

    /// `if condition { then } else { otherwise }`
    pub fn if_else(condition: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Self {
        Stmt::If(Box::new(IfStmt {
            condition,
            then_block: Block { stmts: then },
            else_block: Some(Block { stmts: otherwise }),
        }))
    }

    /// `if condition { then }`
    pub fn if_then(condition: Expr, then: Vec<Stmt>) -> Self {
        Stmt::If(Box::new(IfStmt {
            condition,
            then_block: Block { stmts: then },
            else_block: None,
        }))
    }
}

/// `if` with an optional `else`; both arms are nested blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    #[serde(default)]
    pub else_block: Option<Block>,
}

/// `var a, b T = x, y`; also used for package variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub mutable: bool,
    pub ty: TypeExpr,
    pub names: Vec<String>,
    #[serde(default)]
    pub values: Vec<Expr>,
}

impl VarDecl {
    pub fn new<I, S>(ty: impl Into<TypeExpr>, names: I, values: Vec<Expr>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            public: false,
            mutable: true,
            ty: ty.into(),
            names: names.into_iter().map(Into::into).collect(),
            values,
        }
    }

    pub fn immutable(mut self) -> Self {
        self.mutable = false;
        self
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Zero value of whatever type the context expects
    Nil,
    Ident(String),
    Binary(Box<BinaryExpr>),
    Assign(Box<AssignExpr>),
    Member(Box<MemberExpr>),
    Call(Box<CallExpr>),
    Cast(Box<CastExpr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(Box::new(BinaryExpr { op, left, right }))
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign(Box::new(AssignExpr { target, value }))
    }

    pub fn member(object: Expr, member: impl Into<String>) -> Self {
        Expr::Member(Box::new(MemberExpr {
            object,
            member: member.into(),
        }))
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call(Box::new(CallExpr { callee, args }))
    }

    /// `object.method(args)`
    pub fn method_call(object: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::call(Expr::member(object, method), args)
    }

    pub fn cast(expr: Expr, ty: impl Into<TypeExpr>) -> Self {
        Expr::Cast(Box::new(CastExpr {
            expr,
            ty: ty.into(),
        }))
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Int(_) | Expr::Float(_) | Expr::Bool(_) | Expr::Nil
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Expr,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// `target = value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignExpr {
    pub target: Expr,
    pub value: Expr,
}

/// `object.member`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpr {
    pub object: Expr,
    pub member: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Expr,
    #[serde(default)]
    pub args: Vec<Expr>,
}

/// `expr as T`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastExpr {
    pub expr: Expr,
    pub ty: TypeExpr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_fields_expand_multi_name_properties() {
        let s = StructTypeExpr {
            properties: vec![
                Property::new(PrimitiveType::I32, ["x", "y"]),
                Property::new(PrimitiveType::F64, ["w"]),
            ],
        };
        let names: Vec<_> = s.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x", "y", "w"]);
    }

    #[test]
    fn functions_iterate_private_before_public() {
        let mut pkg = Package::new("main");
        pkg.push_function(FnDecl::new("exported").public());
        pkg.push_function(FnDecl::new("helper"));
        let order: Vec<_> = pkg.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(order, vec!["helper", "exported"]);
    }

    #[test]
    fn primitive_signedness_and_width() {
        assert!(PrimitiveType::I16.is_signed());
        assert!(!PrimitiveType::U16.is_signed());
        assert_eq!(PrimitiveType::U64.bits(), 64);
        assert_eq!(PrimitiveType::Bool.bits(), 1);
    }

    #[test]
    fn if_and_nil_deserialize_from_json() {
        let json = r#"{
            "if": {
                "condition": { "binary": { "op": "eq", "left": { "ident": "p" }, "right": "nil" } },
                "then_block": { "stmts": [ { "return": { "int": 1 } } ] }
            }
        }"#;
        let stmt: Stmt = serde_json::from_str(json).unwrap();
        assert_eq!(
            stmt,
            Stmt::if_then(
                Expr::binary(BinaryOp::Eq, Expr::ident("p"), Expr::Nil),
                vec![Stmt::ret(Expr::Int(1))],
            )
        );
        assert!(Expr::Nil.is_literal());
    }

    #[test]
    fn package_deserializes_from_json() {
        let json = r#"{
            "name": "shapes",
            "private_types": [
                { "name": "Shape", "ty": { "interface": { "methods": [
                    { "name": "area", "return_type": { "primitive": "i32" } }
                ] } } }
            ],
            "private_functions": [
                { "name": "main", "return_type": { "primitive": "i32" },
                  "body": { "stmts": [ { "return": { "int": 0 } } ] } }
            ]
        }"#;
        let pkg: Package = serde_json::from_str(json).unwrap();
        assert_eq!(pkg.name, "shapes");
        assert!(pkg.private_types[0].as_interface().is_some());
        assert_eq!(
            pkg.private_functions[0].body.as_ref().unwrap().stmts[0],
            Stmt::ret(Expr::Int(0))
        );
    }
}
