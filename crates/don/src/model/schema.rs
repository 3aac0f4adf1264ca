//! Type descriptors, constraint sets and schema construction.
//!
//! A [`Schema`] is the language-neutral form every front-end compiles down
//! to. It is checked once, at construction: bounds must be satisfiable,
//! constraints must apply to the type they are attached to, names must be
//! unique and named type references must resolve without cycles. Nothing
//! downstream re-checks these properties.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::{Path, SchemaError};
use crate::model::order::compare_values;
use crate::model::value::Value;

// =============================================================================
// ENUMS
// =============================================================================

/// Underlying integer width of an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    pub fn name(self) -> &'static str {
        match self {
            IntWidth::I8 => "int8",
            IntWidth::I16 => "int16",
            IntWidth::I32 => "int32",
            IntWidth::I64 => "int64",
        }
    }

    /// Returns true if `value` is representable at this width.
    pub fn contains(self, value: i64) -> bool {
        match self {
            IntWidth::I8 => i8::try_from(value).is_ok(),
            IntWidth::I16 => i16::try_from(value).is_ok(),
            IntWidth::I32 => i32::try_from(value).is_ok(),
            IntWidth::I64 => true,
        }
    }
}

/// One named enum member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: String,
    pub discriminant: i64,
}

/// A named enumeration: ordered name -> discriminant mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    name: String,
    width: IntWidth,
    variants: Vec<EnumVariant>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, width: IntWidth) -> Self {
        Self {
            name: name.into(),
            width,
            variants: Vec::new(),
        }
    }

    /// Appends a variant.
    pub fn variant(mut self, name: impl Into<String>, discriminant: i64) -> Self {
        self.variants.push(EnumVariant {
            name: name.into(),
            discriminant,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> IntWidth {
        self.width
    }

    pub fn variants(&self) -> &[EnumVariant] {
        &self.variants
    }

    pub fn name_of(&self, discriminant: i64) -> Option<&str> {
        self.variants
            .iter()
            .find(|v| v.discriminant == discriminant)
            .map(|v| v.name.as_str())
    }

    pub fn discriminant_of(&self, name: &str) -> Option<i64> {
        self.variants.iter().find(|v| v.name == name).map(|v| v.discriminant)
    }
}

// =============================================================================
// CONSTRAINTS
// =============================================================================

/// Row order declared by a `sorted` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Applies this order to an ascending comparison.
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// A string pattern, compiled when its schema is constructed.
///
/// Patterns are anchored at both ends unless they start with `^` or end with
/// `$` themselves.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            regex: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn anchored_source(&self) -> String {
        if self.source.starts_with('^') || self.source.ends_with('$') {
            self.source.clone()
        } else {
            format!("^(?:{})$", self.source)
        }
    }

    fn compile(&mut self) -> Result<(), regex::Error> {
        self.regex = Some(Regex::new(&self.anchored_source())?);
        Ok(())
    }

    /// Tests `text` against the anchored pattern.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Declarative rules attached to a field, column, array item or schema root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub nullable: bool,
    /// Frame columns only: all non-null values distinct.
    pub unique: bool,
    /// Frame columns only.
    pub sorted: Option<SortOrder>,
    /// Inclusive lower bound; variant matches the numeric type.
    pub min: Option<Value>,
    /// Inclusive upper bound; variant matches the numeric type.
    pub max: Option<Value>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub pattern: Option<Pattern>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn sorted(mut self, order: SortOrder) -> Self {
        self.sorted = Some(order);
        self
    }

    pub fn min(mut self, bound: impl Into<Value>) -> Self {
        self.min = Some(bound.into());
        self
    }

    pub fn max(mut self, bound: impl Into<Value>) -> Self {
        self.max = Some(bound.into());
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = Some(n);
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(Pattern::new(pattern));
        self
    }
}

// =============================================================================
// TYPE DESCRIPTORS
// =============================================================================

/// A named, typed, constrained slot: an object field or a frame column.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeDescriptor,
    pub constraints: Constraints,
}

/// Frame columns share the field shape.
pub type Column = Field;

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            constraints: Constraints::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.constraints.nullable = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub fields: Vec<Field>,
}

impl ObjectType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub items: Box<TypeDescriptor>,
    /// Applied to each element.
    pub item_constraints: Constraints,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameType {
    pub columns: Vec<Column>,
}

impl FrameType {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The first column declaring a `sorted` constraint, which pins row order.
    pub fn row_order_column(&self) -> Option<(usize, SortOrder)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.constraints.sorted.map(|order| (i, order)))
    }
}

/// Closed, recursively defined set of DON types.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Null,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    BigInt,
    Float32,
    Float64,
    Decimal,
    String,
    Bytes,
    /// Byte sequence of exactly N bytes.
    FixedBytes(usize),
    Uuid,
    Date,
    Time,
    DateTime,
    Duration,
    Enum(EnumType),
    Object(ObjectType),
    Array(ArrayType),
    Frame(FrameType),
    /// Reference to a type defined on a [`SchemaBuilder`]; resolved away at build.
    Ref(String),
}

impl TypeDescriptor {
    pub fn object(fields: Vec<Field>) -> Self {
        TypeDescriptor::Object(ObjectType { fields })
    }

    pub fn array(items: TypeDescriptor) -> Self {
        Self::array_with(items, Constraints::default())
    }

    pub fn array_with(items: TypeDescriptor, item_constraints: Constraints) -> Self {
        TypeDescriptor::Array(ArrayType {
            items: Box::new(items),
            item_constraints,
        })
    }

    pub fn frame(columns: Vec<Column>) -> Self {
        TypeDescriptor::Frame(FrameType { columns })
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeDescriptor::Ref(name.into())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Int8
                | TypeDescriptor::Int16
                | TypeDescriptor::Int32
                | TypeDescriptor::Int64
                | TypeDescriptor::BigInt
                | TypeDescriptor::Float32
                | TypeDescriptor::Float64
                | TypeDescriptor::Decimal
        )
    }

    /// Scalar types with a meaningful order (usable as `sorted` columns).
    pub fn is_orderable_scalar(&self) -> bool {
        !matches!(
            self,
            TypeDescriptor::Null
                | TypeDescriptor::Object(_)
                | TypeDescriptor::Array(_)
                | TypeDescriptor::Frame(_)
                | TypeDescriptor::Ref(_)
        )
    }

    /// Returns true if `value`'s variant is the one this type holds.
    ///
    /// Enum membership and fixed sizes are not checked here.
    pub fn accepts_variant(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (TypeDescriptor::Null, Value::Null)
                | (TypeDescriptor::Bool, Value::Bool(_))
                | (TypeDescriptor::Int8, Value::Int8(_))
                | (TypeDescriptor::Int16, Value::Int16(_))
                | (TypeDescriptor::Int32, Value::Int32(_))
                | (TypeDescriptor::Int64, Value::Int64(_))
                | (TypeDescriptor::BigInt, Value::BigInt(_))
                | (TypeDescriptor::Float32, Value::Float32(_))
                | (TypeDescriptor::Float64, Value::Float64(_))
                | (TypeDescriptor::Decimal, Value::Decimal(_))
                | (TypeDescriptor::String, Value::String(_))
                | (TypeDescriptor::Bytes, Value::Bytes(_))
                | (TypeDescriptor::FixedBytes(_), Value::Bytes(_))
                | (TypeDescriptor::Uuid, Value::Uuid(_))
                | (TypeDescriptor::Date, Value::Date(_))
                | (TypeDescriptor::Time, Value::Time(_))
                | (TypeDescriptor::DateTime, Value::DateTime(_))
                | (TypeDescriptor::Duration, Value::Duration(_))
                | (TypeDescriptor::Enum(_), Value::Enum(_))
                | (TypeDescriptor::Object(_), Value::Object(_))
                | (TypeDescriptor::Array(_), Value::Array(_))
                | (TypeDescriptor::Frame(_), Value::Frame(_))
        )
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Null => write!(f, "null"),
            TypeDescriptor::Bool => write!(f, "bool"),
            TypeDescriptor::Int8 => write!(f, "int8"),
            TypeDescriptor::Int16 => write!(f, "int16"),
            TypeDescriptor::Int32 => write!(f, "int32"),
            TypeDescriptor::Int64 => write!(f, "int64"),
            TypeDescriptor::BigInt => write!(f, "bigint"),
            TypeDescriptor::Float32 => write!(f, "float32"),
            TypeDescriptor::Float64 => write!(f, "float64"),
            TypeDescriptor::Decimal => write!(f, "decimal"),
            TypeDescriptor::String => write!(f, "string"),
            TypeDescriptor::Bytes => write!(f, "bytes"),
            TypeDescriptor::FixedBytes(n) => write!(f, "fixed_bytes({})", n),
            TypeDescriptor::Uuid => write!(f, "uuid"),
            TypeDescriptor::Date => write!(f, "date"),
            TypeDescriptor::Time => write!(f, "time"),
            TypeDescriptor::DateTime => write!(f, "datetime"),
            TypeDescriptor::Duration => write!(f, "duration"),
            TypeDescriptor::Enum(e) => write!(f, "enum {}", e.name),
            TypeDescriptor::Object(_) => write!(f, "object"),
            TypeDescriptor::Array(a) => write!(f, "array<{}>", a.items),
            TypeDescriptor::Frame(_) => write!(f, "frame"),
            TypeDescriptor::Ref(name) => write!(f, "ref {}", name),
        }
    }
}

// =============================================================================
// SCHEMA
// =============================================================================

/// A validated, reference-free type tree plus the root's constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    root: TypeDescriptor,
    constraints: Constraints,
}

impl Schema {
    /// Checks and wraps a type tree that uses no named references.
    pub fn new(root: TypeDescriptor) -> Result<Self, SchemaError> {
        SchemaBuilder::new().build(root)
    }

    pub fn with_constraints(root: TypeDescriptor, constraints: Constraints) -> Result<Self, SchemaError> {
        SchemaBuilder::new().build_with_constraints(root, constraints)
    }

    pub fn root(&self) -> &TypeDescriptor {
        &self.root
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }
}

/// Collects named type definitions and builds a [`Schema`] from them.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    definitions: Vec<(String, TypeDescriptor)>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named type that other types may reference with [`TypeDescriptor::Ref`].
    pub fn define(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.definitions.push((name.into(), ty));
        self
    }

    pub fn build(self, root: TypeDescriptor) -> Result<Schema, SchemaError> {
        self.build_with_constraints(root, Constraints::default())
    }

    pub fn build_with_constraints(
        self,
        root: TypeDescriptor,
        mut constraints: Constraints,
    ) -> Result<Schema, SchemaError> {
        let mut definitions = FxHashMap::default();
        let mut order = Vec::with_capacity(self.definitions.len());
        for (name, ty) in self.definitions {
            if definitions.contains_key(&name) {
                return Err(SchemaError::DuplicateDefinition { name });
            }
            order.push(name.clone());
            definitions.insert(name, ty);
        }

        let mut resolver = Resolver {
            definitions: &definitions,
            resolved: FxHashMap::default(),
            stack: Vec::new(),
            in_progress: FxHashSet::default(),
        };
        // Every definition is checked, referenced or not
        for name in &order {
            resolver.resolve_name(name)?;
        }
        let mut root = resolver.resolve(root)?;

        let path = Path::root();
        check_type(&mut root, &path)?;
        check_constraints(&mut constraints, &root, &path, Position::Root)?;

        debug!(definitions = order.len(), root = %root, "schema constructed");
        Ok(Schema { root, constraints })
    }
}

/// Inlines named references, rejecting cycles with a depth-first walk.
struct Resolver<'a> {
    definitions: &'a FxHashMap<String, TypeDescriptor>,
    resolved: FxHashMap<String, TypeDescriptor>,
    stack: Vec<String>,
    in_progress: FxHashSet<String>,
}

impl Resolver<'_> {
    fn resolve_name(&mut self, name: &str) -> Result<TypeDescriptor, SchemaError> {
        if let Some(ty) = self.resolved.get(name) {
            return Ok(ty.clone());
        }
        if self.in_progress.contains(name) {
            let start = self.stack.iter().position(|n| n == name).unwrap_or(0);
            let mut cycle: Vec<String> = self.stack[start..].to_vec();
            cycle.push(name.to_string());
            return Err(SchemaError::CyclicReference { cycle });
        }
        let definition = self
            .definitions
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnresolvedReference {
                name: name.to_string(),
            })?;

        self.stack.push(name.to_string());
        self.in_progress.insert(name.to_string());
        let ty = self.resolve(definition)?;
        self.in_progress.remove(name);
        self.stack.pop();

        self.resolved.insert(name.to_string(), ty.clone());
        Ok(ty)
    }

    fn resolve(&mut self, ty: TypeDescriptor) -> Result<TypeDescriptor, SchemaError> {
        Ok(match ty {
            TypeDescriptor::Ref(name) => self.resolve_name(&name)?,
            TypeDescriptor::Object(object) => TypeDescriptor::Object(ObjectType {
                fields: self.resolve_fields(object.fields)?,
            }),
            TypeDescriptor::Array(array) => TypeDescriptor::Array(ArrayType {
                items: Box::new(self.resolve(*array.items)?),
                item_constraints: array.item_constraints,
            }),
            TypeDescriptor::Frame(frame) => TypeDescriptor::Frame(FrameType {
                columns: self.resolve_fields(frame.columns)?,
            }),
            other => other,
        })
    }

    fn resolve_fields(&mut self, fields: Vec<Field>) -> Result<Vec<Field>, SchemaError> {
        fields
            .into_iter()
            .map(|field| {
                Ok(Field {
                    ty: self.resolve(field.ty)?,
                    ..field
                })
            })
            .collect()
    }
}

/// Where a constraint set is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Root,
    Field,
    Item,
    Column,
}

fn check_type(ty: &mut TypeDescriptor, path: &Path) -> Result<(), SchemaError> {
    match ty {
        TypeDescriptor::FixedBytes(0) => Err(SchemaError::ZeroFixedSize { path: path.clone() }),
        TypeDescriptor::Enum(e) => check_enum(e, path),
        TypeDescriptor::Object(object) => check_fields(&mut object.fields, path, Position::Field),
        TypeDescriptor::Array(array) => {
            let item_path = path.element();
            check_type(&mut array.items, &item_path)?;
            check_constraints(&mut array.item_constraints, &array.items, &item_path, Position::Item)
        }
        TypeDescriptor::Frame(frame) => check_fields(&mut frame.columns, path, Position::Column),
        TypeDescriptor::Ref(name) => Err(SchemaError::UnresolvedReference { name: name.clone() }),
        _ => Ok(()),
    }
}

fn check_fields(fields: &mut [Field], path: &Path, position: Position) -> Result<(), SchemaError> {
    let mut seen = FxHashSet::default();
    for field in fields.iter_mut() {
        if !seen.insert(field.name.clone()) {
            return Err(SchemaError::DuplicateName {
                path: path.clone(),
                name: field.name.clone(),
            });
        }
        let field_path = path.key(&field.name);
        check_type(&mut field.ty, &field_path)?;
        check_constraints(&mut field.constraints, &field.ty, &field_path, position)?;
    }
    Ok(())
}

fn check_enum(e: &EnumType, path: &Path) -> Result<(), SchemaError> {
    let mut names = FxHashSet::default();
    let mut discriminants = FxHashSet::default();
    for variant in &e.variants {
        if !names.insert(variant.name.as_str()) {
            return Err(SchemaError::DuplicateName {
                path: path.clone(),
                name: variant.name.clone(),
            });
        }
        if !discriminants.insert(variant.discriminant) {
            return Err(SchemaError::DuplicateDiscriminant {
                path: path.clone(),
                discriminant: variant.discriminant,
            });
        }
        if !e.width.contains(variant.discriminant) {
            return Err(SchemaError::DiscriminantOutOfRange {
                path: path.clone(),
                discriminant: variant.discriminant,
                width: e.width.name(),
            });
        }
    }
    Ok(())
}

fn check_constraints(
    c: &mut Constraints,
    ty: &TypeDescriptor,
    path: &Path,
    position: Position,
) -> Result<(), SchemaError> {
    let inapplicable = |constraint: &'static str| SchemaError::InapplicableConstraint {
        path: path.clone(),
        constraint,
        ty: ty.to_string(),
    };

    if c.min.is_some() || c.max.is_some() {
        if !ty.is_numeric() {
            return Err(inapplicable(if c.min.is_some() { "min" } else { "max" }));
        }
        for bound in [&c.min, &c.max].into_iter().flatten() {
            if !ty.accepts_variant(bound) {
                return Err(SchemaError::BoundTypeMismatch {
                    path: path.clone(),
                    expected: ty.to_string(),
                    found: bound.type_name(),
                });
            }
        }
        if let (Some(min), Some(max)) = (&c.min, &c.max) {
            if compare_values(min, max) == Ordering::Greater {
                return Err(SchemaError::MinGreaterThanMax {
                    path: path.clone(),
                    min: min.summary(),
                    max: max.summary(),
                });
            }
        }
    }

    if c.min_length.is_some() || c.max_length.is_some() {
        if !matches!(
            ty,
            TypeDescriptor::String | TypeDescriptor::Bytes | TypeDescriptor::FixedBytes(_)
        ) {
            return Err(inapplicable(if c.min_length.is_some() { "min_length" } else { "max_length" }));
        }
        if let (Some(min), Some(max)) = (c.min_length, c.max_length) {
            if min > max {
                return Err(SchemaError::MinLengthGreaterThanMaxLength {
                    path: path.clone(),
                    min,
                    max,
                });
            }
        }
    }

    if c.min_items.is_some() || c.max_items.is_some() {
        if !matches!(ty, TypeDescriptor::Array(_)) {
            return Err(inapplicable(if c.min_items.is_some() { "min_items" } else { "max_items" }));
        }
        if let (Some(min), Some(max)) = (c.min_items, c.max_items) {
            if min > max {
                return Err(SchemaError::MinItemsGreaterThanMaxItems {
                    path: path.clone(),
                    min,
                    max,
                });
            }
        }
    }

    if let Some(pattern) = c.pattern.as_mut() {
        if !matches!(ty, TypeDescriptor::String) {
            return Err(inapplicable("pattern"));
        }
        pattern.compile().map_err(|e| SchemaError::InvalidPattern {
            path: path.clone(),
            pattern: pattern.source.clone(),
            reason: e.to_string(),
        })?;
    }

    if c.unique && position != Position::Column {
        return Err(inapplicable("unique"));
    }
    if c.sorted.is_some() && (position != Position::Column || !ty.is_orderable_scalar()) {
        return Err(inapplicable("sorted"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> TypeDescriptor {
        TypeDescriptor::object(vec![
            Field::new("name", TypeDescriptor::String),
            Field::new("age", TypeDescriptor::Int32)
                .with_constraints(Constraints::new().min(0).max(150)),
        ])
    }

    #[test]
    fn test_valid_schema() {
        let schema = Schema::new(person()).unwrap();
        assert!(matches!(schema.root(), TypeDescriptor::Object(_)));
    }

    #[test]
    fn test_min_greater_than_max() {
        let ty = TypeDescriptor::object(vec![Field::new("n", TypeDescriptor::Int32)
            .with_constraints(Constraints::new().min(10).max(5))]);
        let err = Schema::new(ty).unwrap_err();
        assert!(matches!(err, SchemaError::MinGreaterThanMax { .. }));
        assert_eq!(err.to_string(), "$.n: min 10 is greater than max 5");
    }

    #[test]
    fn test_min_length_greater_than_max_length() {
        let ty = TypeDescriptor::object(vec![Field::new("s", TypeDescriptor::String)
            .with_constraints(Constraints::new().min_length(4).max_length(2))]);
        assert!(matches!(
            Schema::new(ty),
            Err(SchemaError::MinLengthGreaterThanMaxLength { min: 4, max: 2, .. })
        ));
    }

    #[test]
    fn test_bound_type_must_match() {
        let ty = TypeDescriptor::object(vec![Field::new("n", TypeDescriptor::Int64)
            .with_constraints(Constraints::new().min(0))]);
        assert!(matches!(
            Schema::new(ty),
            Err(SchemaError::BoundTypeMismatch { found: "int32", .. })
        ));
    }

    #[test]
    fn test_inapplicable_constraints() {
        let on_string = TypeDescriptor::object(vec![Field::new("s", TypeDescriptor::String)
            .with_constraints(Constraints::new().min(Value::Int32(1)))]);
        assert!(matches!(
            Schema::new(on_string),
            Err(SchemaError::InapplicableConstraint { constraint: "min", .. })
        ));

        let unique_field = TypeDescriptor::object(vec![Field::new("id", TypeDescriptor::Int32)
            .with_constraints(Constraints::new().unique())]);
        assert!(matches!(
            Schema::new(unique_field),
            Err(SchemaError::InapplicableConstraint { constraint: "unique", .. })
        ));

        let sorted_object_column = TypeDescriptor::frame(vec![Field::new(
            "o",
            TypeDescriptor::object(vec![]),
        )
        .with_constraints(Constraints::new().sorted(SortOrder::Asc))]);
        assert!(matches!(
            Schema::new(sorted_object_column),
            Err(SchemaError::InapplicableConstraint { constraint: "sorted", .. })
        ));
    }

    #[test]
    fn test_duplicate_field_names() {
        let ty = TypeDescriptor::object(vec![
            Field::new("a", TypeDescriptor::Bool),
            Field::new("a", TypeDescriptor::Int8),
        ]);
        assert!(matches!(Schema::new(ty), Err(SchemaError::DuplicateName { .. })));
    }

    #[test]
    fn test_enum_checks() {
        let dup = EnumType::new("Color", IntWidth::I8).variant("red", 1).variant("blue", 1);
        assert!(matches!(
            Schema::new(TypeDescriptor::Enum(dup)),
            Err(SchemaError::DuplicateDiscriminant { discriminant: 1, .. })
        ));

        let wide = EnumType::new("Color", IntWidth::I8).variant("red", 300);
        assert!(matches!(
            Schema::new(TypeDescriptor::Enum(wide)),
            Err(SchemaError::DiscriminantOutOfRange { discriminant: 300, .. })
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let ty = TypeDescriptor::object(vec![Field::new("s", TypeDescriptor::String)
            .with_constraints(Constraints::new().pattern("(unclosed"))]);
        assert!(matches!(Schema::new(ty), Err(SchemaError::InvalidPattern { .. })));
    }

    #[test]
    fn test_pattern_anchoring() {
        let mut anchored = Pattern::new(r"\d{4}-\d{2}-\d{2}");
        anchored.compile().unwrap();
        assert!(anchored.is_match("2024-01-05"));
        assert!(!anchored.is_match("x2024-01-05"));
        assert!(!anchored.is_match("2024-1-5"));

        let mut prefix_only = Pattern::new("^ab");
        prefix_only.compile().unwrap();
        assert!(prefix_only.is_match("abc"));
    }

    #[test]
    fn test_references_are_inlined() {
        let schema = SchemaBuilder::new()
            .define("Person", person())
            .build(TypeDescriptor::array(TypeDescriptor::reference("Person")))
            .unwrap();
        match schema.root() {
            TypeDescriptor::Array(a) => assert_eq!(*a.items, person()),
            other => panic!("unexpected root {}", other),
        }
    }

    #[test]
    fn test_cycle_detected() {
        let result = SchemaBuilder::new()
            .define(
                "Node",
                TypeDescriptor::object(vec![Field::new("next", TypeDescriptor::reference("Link"))]),
            )
            .define(
                "Link",
                TypeDescriptor::array(TypeDescriptor::reference("Node")),
            )
            .build(TypeDescriptor::reference("Node"));
        match result {
            Err(SchemaError::CyclicReference { cycle }) => {
                assert_eq!(cycle, vec!["Node", "Link", "Node"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_detected() {
        let result = SchemaBuilder::new()
            .define("Tree", TypeDescriptor::array(TypeDescriptor::reference("Tree")))
            .build(TypeDescriptor::Bool);
        assert!(matches!(result, Err(SchemaError::CyclicReference { .. })));
    }

    #[test]
    fn test_unresolved_and_duplicate_definitions() {
        assert!(matches!(
            Schema::new(TypeDescriptor::reference("Missing")),
            Err(SchemaError::UnresolvedReference { .. })
        ));
        let result = SchemaBuilder::new()
            .define("A", TypeDescriptor::Bool)
            .define("A", TypeDescriptor::Int8)
            .build(TypeDescriptor::Bool);
        assert!(matches!(result, Err(SchemaError::DuplicateDefinition { .. })));
    }

    #[test]
    fn test_shared_reference_is_not_a_cycle() {
        let schema = SchemaBuilder::new()
            .define("Id", TypeDescriptor::Uuid)
            .build(TypeDescriptor::object(vec![
                Field::new("a", TypeDescriptor::reference("Id")),
                Field::new("b", TypeDescriptor::reference("Id")),
            ]));
        assert!(schema.is_ok());
    }
}
