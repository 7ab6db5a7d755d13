//! Per-type storage: the entry struct and its variants.

use shadow_ir::{ExprId, MethodKind, Modifiers, Name, TypeId};

/// The twelve primitive types.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Code,
    Long,
    ULong,
    Float,
    Double,
}

impl PrimitiveKind {
    /// Storage width in bytes.
    pub fn width(self) -> u32 {
        match self {
            PrimitiveKind::Boolean | PrimitiveKind::Byte | PrimitiveKind::UByte => 1,
            PrimitiveKind::Short | PrimitiveKind::UShort => 2,
            PrimitiveKind::Int
            | PrimitiveKind::UInt
            | PrimitiveKind::Code
            | PrimitiveKind::Float => 4,
            PrimitiveKind::Long | PrimitiveKind::ULong | PrimitiveKind::Double => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            PrimitiveKind::Boolean | PrimitiveKind::Float | PrimitiveKind::Double
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Int | PrimitiveKind::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    /// Source-level keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::UByte => "ubyte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::UShort => "ushort",
            PrimitiveKind::Int => "int",
            PrimitiveKind::UInt => "uint",
            PrimitiveKind::Code => "code",
            PrimitiveKind::Long => "long",
            PrimitiveKind::ULong => "ulong",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub const ALL: [PrimitiveKind; 12] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::UByte,
        PrimitiveKind::Short,
        PrimitiveKind::UShort,
        PrimitiveKind::Int,
        PrimitiveKind::UInt,
        PrimitiveKind::Code,
        PrimitiveKind::Long,
        PrimitiveKind::ULong,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];
}

/// One declared field: name, modified type, optional initializer expression
/// (an id into the declaring module's arena).
#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: Name,
    pub ty: TypeId,
    pub modifiers: Modifiers,
    pub initializer: Option<ExprId>,
}

/// Variant-specific data for a type entry.
#[derive(Clone, Debug)]
pub enum TypeVariant {
    Primitive(PrimitiveKind),
    /// A class: `extends` is [`TypeId::NONE`] only for `Object`.
    Class { extends: TypeId },
    /// An interface: no extends chain, constant fields only.
    Interface,
    /// `base[]` with `dims` dimensions; `nullable` arrays extend
    /// `ArrayNullable` instead of `Array`. Invariant in both.
    Array {
        base: TypeId,
        nullable: bool,
        dims: u32,
    },
    /// Ordered element types: size 0 is `void`, size 1 unwraps
    /// transparently at the use site.
    Sequence { elements: Vec<TypeId> },
    /// A method signature: parameter and return sequences.
    Method {
        outer: TypeId,
        params: Vec<TypeId>,
        returns: Vec<TypeId>,
        kind: MethodKind,
    },
    /// A named, bounded type parameter.
    TypeParameter { bounds: Vec<TypeId> },
    Attribute,
    Unknown,
    /// The type of the `null` literal.
    Null,
}

/// One entry in the pool.
///
/// Members (`interfaces`, `fields`, `methods`, …) are meaningful for class
/// and interface entries; structural entries leave them empty.
#[derive(Clone, Debug)]
pub struct TypeEntry {
    pub name: Name,
    /// Package-prefixed name, e.g. `shadow:standard@Object`.
    pub qualified: Name,
    pub modifiers: Modifiers,
    /// Enclosing type, or [`TypeId::NONE`].
    pub outer: TypeId,
    pub variant: TypeVariant,
    /// Directly implemented interfaces.
    pub interfaces: Vec<TypeId>,
    /// Formal type parameters (TypeParameter entries), declaration order.
    pub type_params: Vec<TypeId>,
    /// Actual type arguments; empty on uninstantiated types.
    pub type_args: Vec<TypeId>,
    /// The generic this entry was instantiated from, or [`TypeId::NONE`].
    pub uninstantiated: TypeId,
    /// Directly referenced types, filled during module build.
    pub referenced: Vec<TypeId>,
    /// Inner types, declaration order.
    pub inners: Vec<TypeId>,
    /// Ordered field map.
    pub fields: Vec<FieldInfo>,
    /// Ordered method map: name to overload list of Method entries.
    pub methods: Vec<(Name, Vec<TypeId>)>,
}

impl TypeEntry {
    /// A bare entry with the given identity; members start empty.
    pub fn new(name: Name, qualified: Name, modifiers: Modifiers, variant: TypeVariant) -> Self {
        TypeEntry {
            name,
            qualified,
            modifiers,
            outer: TypeId::NONE,
            variant,
            interfaces: Vec::new(),
            type_params: Vec::new(),
            type_args: Vec::new(),
            uninstantiated: TypeId::NONE,
            referenced: Vec::new(),
            inners: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.variant, TypeVariant::Class { .. })
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.variant, TypeVariant::Interface)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.variant, TypeVariant::Array { .. })
    }

    /// Classes, interfaces, and arrays live on the heap and carry the
    /// object header.
    pub fn is_reference(&self) -> bool {
        matches!(
            self.variant,
            TypeVariant::Class { .. }
                | TypeVariant::Interface
                | TypeVariant::Array { .. }
                | TypeVariant::TypeParameter { .. }
        )
    }

    /// The field overload list for `name`, if declared here.
    pub fn field(&self, name: Name) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The method overload list for `name`, if any overload is declared here.
    pub fn overloads(&self, name: Name) -> Option<&[TypeId]> {
        self.methods
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, list)| list.as_slice())
    }
}
