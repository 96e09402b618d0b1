use crate::shared::constants::{FROM_SAMPLER, TO_SAMPLER};

/// Component type of a uniform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Float,
    Int,
    Uint,
    /// Stored as a `uint` member, read back through a comparison.
    Bool,
}

/// Non-opaque uniform types a transition program may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformType {
    Scalar(ScalarKind),
    Vector(ScalarKind, u8),
    /// Square float matrix, `matN`.
    Matrix(u8),
}

impl UniformType {
    pub fn parse(glsl: &str) -> Option<Self> {
        let vector = |prefix: &str, kind: ScalarKind| {
            glsl.strip_prefix(prefix)
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (2..=4).contains(n))
                .map(|n| UniformType::Vector(kind, n))
        };

        match glsl {
            "float" => Some(UniformType::Scalar(ScalarKind::Float)),
            "int" => Some(UniformType::Scalar(ScalarKind::Int)),
            "uint" => Some(UniformType::Scalar(ScalarKind::Uint)),
            "bool" => Some(UniformType::Scalar(ScalarKind::Bool)),
            "mat2" => Some(UniformType::Matrix(2)),
            "mat3" => Some(UniformType::Matrix(3)),
            "mat4" => Some(UniformType::Matrix(4)),
            _ => vector("vec", ScalarKind::Float)
                .or_else(|| vector("ivec", ScalarKind::Int))
                .or_else(|| vector("uvec", ScalarKind::Uint))
                .or_else(|| vector("bvec", ScalarKind::Bool)),
        }
    }

    pub fn glsl_name(&self) -> String {
        match self {
            UniformType::Scalar(ScalarKind::Float) => "float".to_string(),
            UniformType::Scalar(ScalarKind::Int) => "int".to_string(),
            UniformType::Scalar(ScalarKind::Uint) => "uint".to_string(),
            UniformType::Scalar(ScalarKind::Bool) => "bool".to_string(),
            UniformType::Vector(ScalarKind::Float, n) => format!("vec{n}"),
            UniformType::Vector(ScalarKind::Int, n) => format!("ivec{n}"),
            UniformType::Vector(ScalarKind::Uint, n) => format!("uvec{n}"),
            UniformType::Vector(ScalarKind::Bool, n) => format!("bvec{n}"),
            UniformType::Matrix(n) => format!("mat{n}"),
        }
    }

    /// Type of the uniform block member backing this uniform. Booleans have
    /// no std140 representation and are carried as unsigned integers.
    pub fn block_glsl_name(&self) -> String {
        match self {
            UniformType::Scalar(ScalarKind::Bool) => "uint".to_string(),
            UniformType::Vector(ScalarKind::Bool, n) => format!("uvec{n}"),
            _ => self.glsl_name(),
        }
    }

    pub fn is_bool(&self) -> bool {
        self.scalar_kind() == ScalarKind::Bool
    }

    /// Number of scalar components a value for this type must carry.
    pub fn components(&self) -> usize {
        match *self {
            UniformType::Scalar(_) => 1,
            UniformType::Vector(_, n) => n as usize,
            UniformType::Matrix(n) => (n as usize) * (n as usize),
        }
    }

    pub fn scalar_kind(&self) -> ScalarKind {
        match *self {
            UniformType::Scalar(kind) | UniformType::Vector(kind, _) => kind,
            UniformType::Matrix(_) => ScalarKind::Float,
        }
    }
}

/// A declared non-opaque uniform and the value it holds until set.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformDecl {
    pub name: String,
    pub ty: UniformType,
    /// Column-major components; zero unless the source gave an initializer.
    pub default: Vec<f64>,
}

/// A declared `sampler2D` and the source frame it reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerDecl {
    pub name: String,
    /// 0 samples frame A, 1 samples frame B.
    pub unit: u32,
}

impl SamplerDecl {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let unit = if name == TO_SAMPLER { 1 } else { 0 };
        Self { name, unit }
    }

    pub fn is_source_selector(&self) -> bool {
        self.name == FROM_SAMPLER || self.name == TO_SAMPLER
    }
}

/// A transition program: the fixed vertex stage, the caller's fragment
/// stage and what that fragment stage declares.
///
/// Immutable once built; uniform binding consults [`ShaderProgram::declares`]
/// instead of setting blindly.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderProgram {
    pub vertex_source: &'static str,
    pub fragment_source: String,
    pub uniforms: Vec<UniformDecl>,
    pub samplers: Vec<SamplerDecl>,
}

impl ShaderProgram {
    /// Whether `name` is a declared non-opaque uniform.
    pub fn declares(&self, name: &str) -> bool {
        self.uniform(name).is_some()
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformDecl> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    pub fn declared_uniform_names(&self) -> Vec<&str> {
        self.uniforms.iter().map(|u| u.name.as_str()).collect()
    }
}
