//! Validation of values against schemas.
//!
//! The validator walks the value and its schema in lock-step. At every node
//! it checks the type (offering the value to the coercion callback when the
//! type does not match), then nullability, then the node's own constraints,
//! and only then descends into children. Object fields and frame columns are
//! visited in declaration order, so the first error reported is the first
//! one a depth-first walk of the schema meets.
//!
//! Column-wide rules (`unique`, `sorted`) are evaluated over the whole column
//! once its cells have been visited, so they see coerced values. Nulls and
//! cells that failed their type check take no part in either rule.
//!
//! On success the validated value is returned; when coercion replaced parts
//! of it, the replacements are in place.

use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use crate::error::{Path, ValidationError, ValidationErrorKind};
use crate::model::order::compare_values;
use crate::model::schema::{Column, Constraints, FrameType, ObjectType, Schema, SortOrder, TypeDescriptor};
use crate::model::value::{Frame, FrameColumn, Object, Value};
use crate::util::datetime::MICROS_PER_DAY;

/// Coercion callback: given a value whose type does not match, the expected
/// type and the value's location, returns a replacement or a reason.
pub type Coercion<'a> = &'a dyn Fn(&Value, &TypeDescriptor, &Path) -> Result<Value, String>;

/// Options for [`validate`].
#[derive(Clone, Copy, Default)]
pub struct ValidateOptions<'a> {
    /// Report every error instead of stopping at the first.
    pub collect_errors: bool,
    /// Invoked once for each value that fails its type check.
    pub coercion: Option<Coercion<'a>>,
}

impl<'a> ValidateOptions<'a> {
    /// Stops at the first error, no coercion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports every error.
    pub fn collect_all() -> Self {
        Self {
            collect_errors: true,
            coercion: None,
        }
    }

    /// Returns these options with a coercion callback installed.
    pub fn with_coercion(mut self, coercion: Coercion<'a>) -> Self {
        self.coercion = Some(coercion);
        self
    }
}

impl fmt::Debug for ValidateOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateOptions")
            .field("collect_errors", &self.collect_errors)
            .field("coercion", &self.coercion.is_some())
            .finish()
    }
}

/// Validates `value` against `schema`.
///
/// Returns the (possibly coerced) value, or the errors found: one when
/// `collect_errors` is off, all of them in traversal order when it is on.
pub fn validate(value: &Value, schema: &Schema, options: &ValidateOptions<'_>) -> Result<Value, Vec<ValidationError>> {
    let mut validator = Validator {
        options,
        errors: Vec::new(),
    };
    let result = validator.check(value.clone(), schema.root(), schema.constraints(), &Path::root());
    debug!(
        root = value.type_name(),
        errors = validator.errors.len(),
        collect = options.collect_errors,
        "validated value"
    );
    match result {
        Ok(value) if validator.errors.is_empty() => Ok(value),
        _ => Err(validator.errors),
    }
}

/// Raised to unwind the walk once the first error is recorded.
struct Halt;

type Step<T> = Result<T, Halt>;

struct Validator<'o, 'c> {
    options: &'o ValidateOptions<'c>,
    errors: Vec<ValidationError>,
}

fn error(
    path: &Path,
    kind: ValidationErrorKind,
    expected: impl ToString,
    actual: impl ToString,
    message: String,
) -> ValidationError {
    ValidationError {
        path: path.clone(),
        kind,
        expected: expected.to_string(),
        actual: actual.to_string(),
        message,
    }
}

/// Whether a column cell takes part in the `unique` and `sorted` rules.
fn ranked(ty: &TypeDescriptor, value: &Value) -> bool {
    !value.is_null() && ty.accepts_variant(value)
}

fn accepts(ty: &TypeDescriptor, nullable: bool, value: &Value) -> bool {
    if value.is_null() {
        nullable || matches!(ty, TypeDescriptor::Null)
    } else {
        ty.accepts_variant(value)
    }
}

impl Validator<'_, '_> {
    fn report(&mut self, error: ValidationError) -> Step<()> {
        self.errors.push(error);
        if self.options.collect_errors {
            Ok(())
        } else {
            Err(Halt)
        }
    }

    fn check(&mut self, value: Value, ty: &TypeDescriptor, constraints: &Constraints, path: &Path) -> Step<Value> {
        let value = match self.check_type(value, ty, constraints.nullable, path)? {
            Ok(value) => value,
            // Type failure already reported; nothing below it is meaningful
            Err(value) => return Ok(value),
        };
        if value.is_null() {
            return Ok(value);
        }
        self.check_constraints(&value, ty, constraints, path)?;
        self.check_children(value, ty, path)
    }

    /// Returns `Ok(value)` when the type matches (after coercion if needed),
    /// `Err(value)` with the original value once a mismatch is reported.
    fn check_type(
        &mut self,
        value: Value,
        ty: &TypeDescriptor,
        nullable: bool,
        path: &Path,
    ) -> Step<Result<Value, Value>> {
        if accepts(ty, nullable, &value) {
            return Ok(Ok(value));
        }

        let mut reason = None;
        if let Some(coerce) = self.options.coercion {
            match coerce(&value, ty, path) {
                Ok(coerced) if accepts(ty, nullable, &coerced) => return Ok(Ok(coerced)),
                Ok(coerced) => reason = Some(format!("coercion produced {}", coerced.type_name())),
                Err(message) => reason = Some(message),
            }
        }

        let err = if value.is_null() {
            error(
                path,
                ValidationErrorKind::NullNotAllowed,
                ty,
                "null",
                format!("null is not allowed for {}", ty),
            )
        } else {
            let mut message = format!("expected {}, found {}", ty, value.type_name());
            if let Some(reason) = reason {
                message.push_str(": ");
                message.push_str(&reason);
            }
            error(path, ValidationErrorKind::TypeMismatch, ty, value.summary(), message)
        };
        self.report(err)?;
        Ok(Err(value))
    }

    fn check_constraints(
        &mut self,
        value: &Value,
        ty: &TypeDescriptor,
        constraints: &Constraints,
        path: &Path,
    ) -> Step<()> {
        match (ty, value) {
            (TypeDescriptor::FixedBytes(size), Value::Bytes(bytes)) if bytes.len() != *size => {
                self.report(error(
                    path,
                    ValidationErrorKind::TypeMismatch,
                    ty,
                    value.summary(),
                    format!("expected exactly {} bytes, found {}", size, bytes.len()),
                ))?;
            }
            (TypeDescriptor::Time, Value::Time(micros)) if !(0..MICROS_PER_DAY).contains(micros) => {
                self.report(error(
                    path,
                    ValidationErrorKind::TypeMismatch,
                    ty,
                    value.summary(),
                    format!("time of day {} is outside 0..{} microseconds", micros, MICROS_PER_DAY),
                ))?;
            }
            (TypeDescriptor::Enum(enum_type), Value::Enum(d)) if enum_type.name_of(*d).is_none() => {
                self.report(error(
                    path,
                    ValidationErrorKind::UnknownEnumVariant,
                    ty,
                    d,
                    format!("{} is not a variant of enum {}", d, enum_type.name()),
                ))?;
            }
            _ => {}
        }

        if let Some(min) = &constraints.min {
            if compare_values(value, min) == Ordering::Less {
                self.report(error(
                    path,
                    ValidationErrorKind::BelowMinimum,
                    format!(">= {}", min),
                    value.summary(),
                    format!("value {} is below minimum {}", value, min),
                ))?;
            }
        }
        if let Some(max) = &constraints.max {
            if compare_values(value, max) == Ordering::Greater {
                self.report(error(
                    path,
                    ValidationErrorKind::AboveMaximum,
                    format!("<= {}", max),
                    value.summary(),
                    format!("value {} is above maximum {}", value, max),
                ))?;
            }
        }

        let length = match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Bytes(b) => Some(b.len()),
            _ => None,
        };
        if let Some(len) = length {
            if let Some(min) = constraints.min_length.filter(|min| len < *min) {
                self.report(error(
                    path,
                    ValidationErrorKind::TooShort,
                    format!("length >= {}", min),
                    len,
                    format!("length {} is below minimum length {}", len, min),
                ))?;
            }
            if let Some(max) = constraints.max_length.filter(|max| len > *max) {
                self.report(error(
                    path,
                    ValidationErrorKind::TooLong,
                    format!("length <= {}", max),
                    len,
                    format!("length {} is above maximum length {}", len, max),
                ))?;
            }
        }

        if let (Some(pattern), Value::String(s)) = (&constraints.pattern, value) {
            if !pattern.is_match(s) {
                self.report(error(
                    path,
                    ValidationErrorKind::PatternMismatch,
                    format!("/{}/", pattern.source()),
                    value.summary(),
                    format!("{} does not match pattern /{}/", value, pattern.source()),
                ))?;
            }
        }

        if let Value::Array(items) = value {
            let len = items.len();
            if let Some(min) = constraints.min_items.filter(|min| len < *min) {
                self.report(error(
                    path,
                    ValidationErrorKind::TooFewItems,
                    format!("at least {} items", min),
                    len,
                    format!("{} items is fewer than the minimum {}", len, min),
                ))?;
            }
            if let Some(max) = constraints.max_items.filter(|max| len > *max) {
                self.report(error(
                    path,
                    ValidationErrorKind::TooManyItems,
                    format!("at most {} items", max),
                    len,
                    format!("{} items is more than the maximum {}", len, max),
                ))?;
            }
        }
        Ok(())
    }

    fn check_children(&mut self, value: Value, ty: &TypeDescriptor, path: &Path) -> Step<Value> {
        match (ty, value) {
            (TypeDescriptor::Object(object_type), Value::Object(object)) => {
                self.check_object(object, object_type, path).map(Value::Object)
            }
            (TypeDescriptor::Array(array_type), Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| self.check(item, &array_type.items, &array_type.item_constraints, &path.index(i)))
                .collect::<Step<Vec<_>>>()
                .map(Value::Array),
            (TypeDescriptor::Frame(frame_type), Value::Frame(frame)) => {
                self.check_frame(frame, frame_type, path).map(Value::Frame)
            }
            (_, value) => Ok(value),
        }
    }

    fn check_object(&mut self, object: Object, ty: &ObjectType, path: &Path) -> Step<Object> {
        let mut entries: Vec<(String, Option<Value>)> = object.into_iter().map(|(k, v)| (k, Some(v))).collect();

        for field in &ty.fields {
            let field_path = path.key(&field.name);
            match entries.iter_mut().find(|(key, _)| *key == field.name) {
                Some((_, slot)) => {
                    if let Some(value) = slot.take() {
                        *slot = Some(self.check(value, &field.ty, &field.constraints, &field_path)?);
                    }
                }
                None if !field.constraints.nullable => {
                    self.report(error(
                        &field_path,
                        ValidationErrorKind::MissingField,
                        &field.ty,
                        "absent",
                        format!("required field {:?} is missing", field.name),
                    ))?;
                }
                None => {}
            }
        }

        for (key, value) in &entries {
            if ty.field(key).is_none() {
                let actual = value.as_ref().map(Value::summary).unwrap_or_default();
                self.report(error(
                    &path.key(key),
                    ValidationErrorKind::UnknownField,
                    "no such field",
                    actual,
                    format!("field {:?} is not declared in the schema", key),
                ))?;
            }
        }

        Ok(entries
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }

    fn check_frame(&mut self, frame: Frame, ty: &FrameType, path: &Path) -> Step<Frame> {
        let found: Vec<&str> = frame.columns().iter().map(FrameColumn::name).collect();
        let expected: Vec<&str> = ty.columns.iter().map(|c| c.name.as_str()).collect();
        if found != expected {
            let err = error(
                path,
                ValidationErrorKind::ColumnMismatch,
                format!("{:?}", expected),
                format!("{:?}", found),
                format!("frame columns {:?} do not match {:?}", found, expected),
            );
            self.report(err)?;
            return Ok(frame);
        }

        let (row_count, columns) = frame.into_parts();
        let mut checked = Vec::with_capacity(columns.len());
        for (column_type, column) in ty.columns.iter().zip(columns) {
            let column_path = path.key(&column_type.name);
            let (name, values) = column.into_parts();
            let values = values
                .into_iter()
                .enumerate()
                .map(|(row, cell)| self.check(cell, &column_type.ty, &column_type.constraints, &column_path.index(row)))
                .collect::<Step<Vec<_>>>()?;
            self.check_column_rules(&values, column_type, &column_path)?;
            checked.push(FrameColumn::new(name, values));
        }
        Ok(Frame::from_parts(row_count, checked))
    }

    /// Column-wide `unique` and `sorted` rules.
    fn check_column_rules(&mut self, values: &[Value], column: &Column, path: &Path) -> Step<()> {
        if column.constraints.unique {
            for (row, first) in duplicate_rows(values, &column.ty) {
                self.report(error(
                    &path.index(row),
                    ValidationErrorKind::Duplicate,
                    "unique values",
                    values[row].summary(),
                    format!("value {} repeats row {}", values[row], first),
                ))?;
            }
        }

        if let Some(order) = column.constraints.sorted {
            let mut previous: Option<&Value> = None;
            for (row, value) in values.iter().enumerate().filter(|(_, v)| ranked(&column.ty, v)) {
                if let Some(prev) = previous {
                    if order.apply(compare_values(prev, value)) == Ordering::Greater {
                        let direction = match order {
                            SortOrder::Asc => "ascending",
                            SortOrder::Desc => "descending",
                        };
                        self.report(error(
                            &path.index(row),
                            ValidationErrorKind::NotSorted,
                            format!("{} order", direction),
                            value.summary(),
                            format!("value {} breaks {} order after {}", value, direction, prev),
                        ))?;
                    }
                }
                previous = Some(value);
            }
        }
        Ok(())
    }
}

/// Rows holding a value already seen at an earlier row, as
/// `(row, first_row)` pairs in row order. Only ranked cells are compared.
fn duplicate_rows(values: &[Value], ty: &TypeDescriptor) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| ranked(ty, &values[i])).collect();
    // Stable sort keeps equal values in row order
    order.sort_by(|&a, &b| compare_values(&values[a], &values[b]));

    let mut duplicates = Vec::new();
    let mut group_start = 0;
    for i in 1..order.len() {
        if compare_values(&values[order[group_start]], &values[order[i]]) == Ordering::Equal {
            duplicates.push((order[i], order[group_start]));
        } else {
            group_start = i;
        }
    }
    duplicates.sort_unstable();
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::{EnumType, Field, IntWidth};

    fn schema(root: TypeDescriptor) -> Schema {
        Schema::new(root).unwrap()
    }

    fn first_error(value: &Value, schema: &Schema) -> ValidationError {
        let mut errors = validate(value, schema, &ValidateOptions::new()).unwrap_err();
        assert_eq!(errors.len(), 1);
        errors.remove(0)
    }

    fn score_schema() -> Schema {
        schema(TypeDescriptor::object(vec![Field::new("score", TypeDescriptor::Int32)
            .with_constraints(Constraints::new().min(0).max(100))]))
    }

    #[test]
    fn test_min_max() {
        let s = score_schema();
        for ok in [0, 50, 100] {
            let v = Value::Object(Object::new().with("score", ok));
            assert_eq!(validate(&v, &s, &ValidateOptions::new()).unwrap(), v);
        }

        let err = first_error(&Value::Object(Object::new().with("score", 101)), &s);
        assert_eq!(err.kind, ValidationErrorKind::AboveMaximum);
        assert_eq!(err.to_string(), "$.score: value 101 is above maximum 100");

        let err = first_error(&Value::Object(Object::new().with("score", -1)), &s);
        assert_eq!(err.kind, ValidationErrorKind::BelowMinimum);
        assert_eq!(err.expected, ">= 0");
        assert_eq!(err.actual, "-1");
    }

    #[test]
    fn test_date_pattern() {
        let s = schema(TypeDescriptor::object(vec![Field::new("day", TypeDescriptor::String)
            .with_constraints(Constraints::new().pattern(r"\d{4}-\d{2}-\d{2}"))]));
        let ok = Value::Object(Object::new().with("day", "2024-03-15"));
        assert!(validate(&ok, &s, &ValidateOptions::new()).is_ok());

        // Anchored: a match in the middle is not enough
        let bad = Value::Object(Object::new().with("day", "on 2024-03-15"));
        let err = first_error(&bad, &s);
        assert_eq!(err.kind, ValidationErrorKind::PatternMismatch);
        assert_eq!(err.path.to_string(), "$.day");
    }

    #[test]
    fn test_length_counts_chars() {
        let s = Schema::with_constraints(TypeDescriptor::String, Constraints::new().max_length(3)).unwrap();
        assert!(validate(&Value::from("日本語"), &s, &ValidateOptions::new()).is_ok());
        let err = first_error(&Value::from("abcd"), &s);
        assert_eq!(err.kind, ValidationErrorKind::TooLong);
    }

    #[test]
    fn test_items() {
        let s = Schema::with_constraints(
            TypeDescriptor::array(TypeDescriptor::Int32),
            Constraints::new().min_items(1).max_items(2),
        )
        .unwrap();
        assert_eq!(first_error(&Value::Array(vec![]), &s).kind, ValidationErrorKind::TooFewItems);
        let three = Value::Array(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]);
        assert_eq!(first_error(&three, &s).kind, ValidationErrorKind::TooManyItems);
    }

    fn id_frame_schema() -> Schema {
        schema(TypeDescriptor::frame(vec![Field::new("id", TypeDescriptor::Int64)
            .with_constraints(Constraints::new().unique())]))
    }

    fn id_frame(ids: &[i64]) -> Value {
        let values = ids.iter().map(|&i| Value::Int64(i)).collect();
        Value::Frame(Frame::from_columns(vec![FrameColumn::new("id", values)]).unwrap())
    }

    #[test]
    fn test_unique_reports_repeat() {
        let errors = validate(&id_frame(&[1, 2, 2, 3]), &id_frame_schema(), &ValidateOptions::collect_all()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::Duplicate);
        assert_eq!(errors[0].path.to_string(), "$.id[2]");
    }

    #[test]
    fn test_unique_every_repeat_after_first() {
        let errors = validate(&id_frame(&[5, 5, 1, 5]), &id_frame_schema(), &ValidateOptions::collect_all()).unwrap_err();
        let paths: Vec<String> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["$.id[1]", "$.id[3]"]);
    }

    #[test]
    fn test_unique_ignores_nulls() {
        let s = schema(TypeDescriptor::frame(vec![Field::new("id", TypeDescriptor::Int64)
            .with_constraints(Constraints::new().unique().nullable())]));
        let frame = Frame::from_columns(vec![FrameColumn::new(
            "id",
            vec![Value::Null, Value::Int64(1), Value::Null],
        )])
        .unwrap();
        assert!(validate(&Value::Frame(frame), &s, &ValidateOptions::new()).is_ok());
    }

    #[test]
    fn test_sorted_column() {
        let s = schema(TypeDescriptor::frame(vec![Field::new("t", TypeDescriptor::Int32)
            .with_constraints(Constraints::new().sorted(SortOrder::Desc))]));
        let frame = |vals: &[i32]| {
            Value::Frame(
                Frame::from_columns(vec![FrameColumn::new("t", vals.iter().map(|&v| Value::Int32(v)).collect())])
                    .unwrap(),
            )
        };
        assert!(validate(&frame(&[3, 3, 1]), &s, &ValidateOptions::new()).is_ok());
        let err = first_error(&frame(&[3, 4, 1]), &s);
        assert_eq!(err.kind, ValidationErrorKind::NotSorted);
        assert_eq!(err.path.to_string(), "$.t[1]");
    }

    #[test]
    fn test_collect_errors() {
        let s = schema(TypeDescriptor::object(vec![
            Field::new("a", TypeDescriptor::Int32).with_constraints(Constraints::new().max(10)),
            Field::new("b", TypeDescriptor::String).with_constraints(Constraints::new().min_length(2)),
            Field::new("c", TypeDescriptor::Bool),
        ]));
        let value = Value::Object(Object::new().with("c", "yes").with("b", "x").with("a", 11));

        let all = validate(&value, &s, &ValidateOptions::collect_all()).unwrap_err();
        let kinds: Vec<ValidationErrorKind> = all.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ValidationErrorKind::AboveMaximum,
                ValidationErrorKind::TooShort,
                ValidationErrorKind::TypeMismatch,
            ]
        );

        let first = validate(&value, &s, &ValidateOptions::new()).unwrap_err();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0], all[0]);
    }

    #[test]
    fn test_missing_and_unknown_fields() {
        let s = schema(TypeDescriptor::object(vec![
            Field::new("name", TypeDescriptor::String),
            Field::new("nick", TypeDescriptor::String).nullable(),
        ]));
        let value = Value::Object(Object::new().with("extra", 1));
        let errors = validate(&value, &s, &ValidateOptions::collect_all()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, ValidationErrorKind::MissingField);
        assert_eq!(errors[0].path.to_string(), "$.name");
        assert_eq!(errors[1].kind, ValidationErrorKind::UnknownField);
        assert_eq!(errors[1].path.to_string(), "$.extra");
    }

    #[test]
    fn test_null_not_allowed() {
        let s = schema(TypeDescriptor::array(TypeDescriptor::Int32));
        let err = first_error(&Value::Array(vec![Value::Int32(1), Value::Null]), &s);
        assert_eq!(err.kind, ValidationErrorKind::NullNotAllowed);
        assert_eq!(err.path.to_string(), "$[1]");
    }

    #[test]
    fn test_enum_membership() {
        let s = schema(TypeDescriptor::Enum(EnumType::new("Color", IntWidth::I8).variant("red", 0)));
        assert!(validate(&Value::Enum(0), &s, &ValidateOptions::new()).is_ok());
        assert_eq!(first_error(&Value::Enum(1), &s).kind, ValidationErrorKind::UnknownEnumVariant);
    }

    #[test]
    fn test_fixed_bytes_size() {
        let s = schema(TypeDescriptor::FixedBytes(2));
        assert!(validate(&Value::Bytes(vec![1, 2]), &s, &ValidateOptions::new()).is_ok());
        assert_eq!(first_error(&Value::Bytes(vec![1]), &s).kind, ValidationErrorKind::TypeMismatch);
    }

    #[test]
    fn test_coercion_result_is_rechecked() {
        let s = schema(TypeDescriptor::object(vec![Field::new("n", TypeDescriptor::Int64)
            .with_constraints(Constraints::new().max(Value::Int64(10)))]));
        let widen = |value: &Value, ty: &TypeDescriptor, _: &Path| match (value, ty) {
            (Value::Int32(v), TypeDescriptor::Int64) => Ok(Value::Int64(*v as i64)),
            (Value::String(s), TypeDescriptor::Int64) => s.parse().map(Value::Int64).map_err(|e| format!("{}", e)),
            _ => Err("no coercion".to_string()),
        };
        let options = ValidateOptions::new().with_coercion(&widen);

        let coerced = validate(&Value::Object(Object::new().with("n", 7)), &s, &options).unwrap();
        assert_eq!(coerced, Value::Object(Object::new().with("n", Value::Int64(7))));

        // Coerced values still meet the constraints
        let err = validate(&Value::Object(Object::new().with("n", 11)), &s, &options).unwrap_err();
        assert_eq!(err[0].kind, ValidationErrorKind::AboveMaximum);

        let err = validate(&Value::Object(Object::new().with("n", "seven")), &s, &options).unwrap_err();
        assert_eq!(err[0].kind, ValidationErrorKind::TypeMismatch);
        assert!(err[0].message.starts_with("expected int64, found string: "));
    }

    fn parse_int64(value: &Value, ty: &TypeDescriptor, _: &Path) -> Result<Value, String> {
        match (value, ty) {
            (Value::String(s), TypeDescriptor::Int64) => s.parse().map(Value::Int64).map_err(|e| format!("{}", e)),
            _ => Err("no coercion".to_string()),
        }
    }

    fn text_frame(column: &str, cells: &[&str]) -> Value {
        let values = cells.iter().map(|&c| Value::from(c)).collect();
        Value::Frame(Frame::from_columns(vec![FrameColumn::new(column, values)]).unwrap())
    }

    #[test]
    fn test_unique_sees_coerced_values() {
        let options = ValidateOptions::collect_all().with_coercion(&parse_int64);
        let errors = validate(&text_frame("id", &["1", "01"]), &id_frame_schema(), &options).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::Duplicate);
        assert_eq!(errors[0].path.to_string(), "$.id[1]");

        let ok = validate(&text_frame("id", &["1", "2"]), &id_frame_schema(), &options).unwrap();
        assert_eq!(ok, id_frame(&[1, 2]));
    }

    #[test]
    fn test_sorted_sees_coerced_values() {
        let s = schema(TypeDescriptor::frame(vec![Field::new("n", TypeDescriptor::Int64)
            .with_constraints(Constraints::new().sorted(SortOrder::Asc))]));
        let options = ValidateOptions::new().with_coercion(&parse_int64);
        assert!(validate(&text_frame("n", &["9", "10"]), &s, &options).is_ok());

        let err = validate(&text_frame("n", &["10", "9"]), &s, &options).unwrap_err();
        assert_eq!(err[0].kind, ValidationErrorKind::NotSorted);
        assert_eq!(err[0].path.to_string(), "$.n[1]");
    }

    #[test]
    fn test_column_rules_skip_mistyped_cells() {
        let errors = validate(&text_frame("id", &["x", "x"]), &id_frame_schema(), &ValidateOptions::collect_all())
            .unwrap_err();
        let kinds: Vec<ValidationErrorKind> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ValidationErrorKind::TypeMismatch, ValidationErrorKind::TypeMismatch]);
    }

    #[test]
    fn test_time_of_day_range() {
        let s = schema(TypeDescriptor::Time);
        assert!(validate(&Value::Time(0), &s, &ValidateOptions::new()).is_ok());
        assert!(validate(&Value::Time(MICROS_PER_DAY - 1), &s, &ValidateOptions::new()).is_ok());
        assert_eq!(first_error(&Value::Time(MICROS_PER_DAY), &s).kind, ValidationErrorKind::TypeMismatch);
        assert_eq!(first_error(&Value::Time(-1), &s).kind, ValidationErrorKind::TypeMismatch);
    }

    #[test]
    fn test_column_mismatch() {
        let frame = Frame::from_columns(vec![FrameColumn::new("other", vec![Value::Int64(1)])]).unwrap();
        let err = first_error(&Value::Frame(frame), &id_frame_schema());
        assert_eq!(err.kind, ValidationErrorKind::ColumnMismatch);
    }

    #[test]
    fn test_preorder_reports_node_before_children() {
        let s = Schema::with_constraints(
            TypeDescriptor::array(TypeDescriptor::Int32),
            Constraints::new().max_items(1),
        )
        .unwrap();
        let value = Value::Array(vec![Value::from("x"), Value::from("y")]);
        let errors = validate(&value, &s, &ValidateOptions::collect_all()).unwrap_err();
        let paths: Vec<String> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["$", "$[0]", "$[1]"]);
    }
}
