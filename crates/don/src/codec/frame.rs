//! Columnar frame layout.
//!
//! ```text
//! frame    := rows:varint cols:varint column*
//! column   := name:string tag:u8 [size:varint] flags:u8 [bitmap] cell*
//! bitmap   := ceil(rows / 8) bytes, LSB-first, 1 = value present
//! ```
//!
//! `size` is present only for `fixed_bytes` columns. Null rows contribute no
//! cell. Scalar cells are untagged payloads; object, array and frame cells are
//! full tagged values. A `null`-typed column always carries an all-zero bitmap.

use std::borrow::Cow;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::codec::primitives::{Reader, Writer};
use crate::codec::tag::{TypeTag, WireTag};
use crate::codec::value::{
    check_fixed_size, check_limit, decode_dynamic_value, decode_payload, decode_scalar, decode_value,
    encode_dynamic_value, encode_payload, encode_value, enter, read_tag, type_mismatch, write_scalar,
};
use crate::error::{DecodeError, EncodeError, Path};
use crate::limits::{MAX_BYTES_LEN, MAX_FRAME_COLUMNS, MAX_FRAME_ROWS, MAX_STRING_LEN};
use crate::model::order::compare_values;
use crate::model::schema::{FrameType, SortOrder, TypeDescriptor};
use crate::model::value::{Frame, FrameColumn, Value};

/// Column flags bit 0: a null bitmap follows the descriptor.
const COLUMN_HAS_BITMAP: u8 = 0x01;

// =============================================================================
// BITMAPS AND ROW ORDER
// =============================================================================

/// Packs presence bits for `values`: bit `i` is set when row `i` is non-null.
pub fn null_bitmap(values: &[Value]) -> Vec<u8> {
    let mut bitmap = vec![0u8; values.len().div_ceil(8)];
    for (row, value) in values.iter().enumerate() {
        if !value.is_null() {
            bitmap[row / 8] |= 1 << (row % 8);
        }
    }
    bitmap
}

#[inline]
fn is_present(bitmap: &[u8], row: usize) -> bool {
    bitmap[row / 8] & (1 << (row % 8)) != 0
}

fn read_bitmap<'a>(reader: &mut Reader<'a>, rows: usize) -> Result<&'a [u8], DecodeError> {
    let bitmap = reader.read_bytes(rows.div_ceil(8), "null bitmap")?;
    let used = rows % 8;
    if used != 0 {
        let last = bitmap[bitmap.len() - 1];
        if last & !((1u8 << used) - 1) != 0 {
            return Err(DecodeError::ReservedBitsSet {
                context: "null bitmap padding",
                offset: reader.position() - 1,
            });
        }
    }
    Ok(bitmap)
}

/// Row permutation for deterministic output: stable sort by `values` under `order`.
///
/// Ties keep their original relative order.
pub fn sorted_row_order(values: &[Value], order: SortOrder) -> Vec<usize> {
    let mut rows: Vec<usize> = (0..values.len()).collect();
    rows.sort_by(|&a, &b| order.apply(compare_values(&values[a], &values[b])));
    rows
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a frame against its schema type.
pub(crate) fn encode_frame(
    writer: &mut Writer,
    frame: &Frame,
    ty: &FrameType,
    deterministic: bool,
    path: &Path,
) -> Result<(), EncodeError> {
    let names_match = frame.column_count() == ty.columns.len()
        && frame.columns().iter().zip(&ty.columns).all(|(c, col_ty)| c.name() == col_ty.name);
    if !names_match {
        return Err(EncodeError::ColumnMismatch {
            path: path.clone(),
            message: format!(
                "expected [{}], found [{}]",
                ty.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", "),
                frame.columns().iter().map(FrameColumn::name).collect::<Vec<_>>().join(", "),
            ),
        });
    }
    check_limit("frame rows", frame.row_count(), MAX_FRAME_ROWS)?;
    check_limit("frame columns", frame.column_count(), MAX_FRAME_COLUMNS)?;

    let frame: Cow<'_, Frame> = match ty.row_order_column() {
        Some((index, order)) if deterministic => {
            trace!(rows = frame.row_count(), column = index, "reordering frame rows");
            let rows = sorted_row_order(frame.columns()[index].values(), order);
            Cow::Owned(frame.permute_rows(&rows))
        }
        _ => Cow::Borrowed(frame),
    };

    writer.write_varint(frame.row_count() as u64);
    writer.write_varint(frame.column_count() as u64);

    for (column, col_ty) in frame.columns().iter().zip(&ty.columns) {
        let column_path = path.key(&col_ty.name);
        let tag = TypeTag::for_type(&col_ty.ty).ok_or_else(|| EncodeError::ColumnMismatch {
            path: column_path.clone(),
            message: format!("unresolved column type {}", col_ty.ty),
        })?;

        writer.write_string(&col_ty.name);
        writer.write_byte(tag as u8);
        if let TypeDescriptor::FixedBytes(size) = col_ty.ty {
            writer.write_varint(size as u64);
        }

        let null_column = tag == TypeTag::Null;
        if let Some(row) = column.values().iter().position(Value::is_null) {
            if !null_column && !col_ty.constraints.nullable {
                return Err(EncodeError::UnexpectedNull {
                    path: column_path.index(row),
                });
            }
        }
        write_bitmap_if_needed(writer, column.values());

        for (row, value) in column.values().iter().enumerate() {
            if value.is_null() {
                continue;
            }
            let cell_path = column_path.index(row);
            match &col_ty.ty {
                TypeDescriptor::FixedBytes(size) => match value {
                    Value::Bytes(bytes) => {
                        check_fixed_size(bytes, *size, &cell_path)?;
                        writer.write_bytes(bytes);
                    }
                    other => return Err(type_mismatch(&col_ty.ty, other, &cell_path)),
                },
                _ if tag.is_compound() => encode_value(writer, value, &col_ty.ty, false, deterministic, &cell_path)?,
                _ => encode_payload(writer, value, &col_ty.ty, deterministic, &cell_path)?,
            }
        }
    }
    Ok(())
}

/// Encodes a frame without a schema; column types are inferred from their values.
pub(crate) fn encode_frame_dynamic(
    writer: &mut Writer,
    frame: &Frame,
    deterministic: bool,
    path: &Path,
) -> Result<(), EncodeError> {
    check_limit("frame rows", frame.row_count(), MAX_FRAME_ROWS)?;
    check_limit("frame columns", frame.column_count(), MAX_FRAME_COLUMNS)?;
    writer.write_varint(frame.row_count() as u64);
    writer.write_varint(frame.column_count() as u64);

    for column in frame.columns() {
        let column_path = path.key(column.name());
        let tag = column_tag(column, &column_path)?;

        writer.write_string(column.name());
        writer.write_byte(WireTag::packed(tag).to_byte());
        write_bitmap_if_needed(writer, column.values());

        for (row, value) in column.values().iter().enumerate() {
            if value.is_null() {
                continue;
            }
            if tag.is_compound() {
                encode_dynamic_value(writer, value, deterministic, &column_path.index(row))?;
            } else {
                write_scalar(writer, value, true, deterministic, &column_path.index(row))?;
            }
        }
    }
    Ok(())
}

/// The single non-null variant of a column, or `Null` when every cell is null.
fn column_tag(column: &FrameColumn, path: &Path) -> Result<TypeTag, EncodeError> {
    let mut tag = TypeTag::Null;
    for value in column.values().iter().filter(|v| !v.is_null()) {
        let this = TypeTag::of(value);
        if tag == TypeTag::Null {
            tag = this;
        } else if tag != this {
            return Err(EncodeError::HeterogeneousColumn {
                path: path.clone(),
                first: tag.name(),
                other: this.name(),
            });
        }
    }
    Ok(tag)
}

fn write_bitmap_if_needed(writer: &mut Writer, values: &[Value]) {
    if values.iter().any(Value::is_null) {
        writer.write_byte(COLUMN_HAS_BITMAP);
        writer.write_bytes(&null_bitmap(values));
    } else {
        writer.write_byte(0);
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// What follows a column descriptor.
struct ColumnLayout<'a> {
    bitmap: Option<&'a [u8]>,
    present: usize,
}

/// Reads the flags byte and optional bitmap that follow a column's tag.
fn read_column_layout<'a>(
    reader: &mut Reader<'a>,
    rows: usize,
    tag: TypeTag,
    nullable: bool,
    name: &str,
) -> Result<ColumnLayout<'a>, DecodeError> {
    let flags_offset = reader.position();
    let flags = reader.read_byte("column flags")?;
    if flags & !COLUMN_HAS_BITMAP != 0 {
        return Err(DecodeError::ReservedBitsSet {
            context: "column flags",
            offset: flags_offset,
        });
    }

    let bitmap = if flags & COLUMN_HAS_BITMAP != 0 {
        if !nullable && tag != TypeTag::Null {
            return Err(DecodeError::UnexpectedNullBitmap {
                column: name.to_string(),
                offset: flags_offset,
            });
        }
        Some(read_bitmap(reader, rows)?)
    } else {
        None
    };

    let present = match bitmap {
        Some(bits) => bits.iter().map(|b| b.count_ones() as usize).sum(),
        None => rows,
    };
    if tag == TypeTag::Null && present != 0 {
        return Err(DecodeError::NotCanonical {
            context: "null column bitmap",
            offset: flags_offset,
        });
    }
    // Every cell takes at least one byte
    if present > reader.remaining_len() {
        return Err(DecodeError::LengthExceedsBuffer {
            field: "frame column",
            len: present,
            remaining: reader.remaining_len(),
            offset: reader.position(),
        });
    }
    Ok(ColumnLayout { bitmap, present })
}

fn read_cells<'a>(
    reader: &mut Reader<'a>,
    rows: usize,
    layout: &ColumnLayout<'_>,
    mut read_cell: impl FnMut(&mut Reader<'a>) -> Result<Value, DecodeError>,
) -> Result<Vec<Value>, DecodeError> {
    let mut values = Vec::with_capacity(rows);
    if layout.present == 0 {
        values.resize(rows, Value::Null);
        return Ok(values);
    }
    for row in 0..rows {
        let present = layout.bitmap.is_none_or(|bits| is_present(bits, row));
        values.push(if present { read_cell(reader)? } else { Value::Null });
    }
    Ok(values)
}

fn read_column_name(
    reader: &mut Reader<'_>,
    seen: &mut FxHashSet<String>,
) -> Result<(String, usize), DecodeError> {
    let offset = reader.position();
    let name = reader.read_string(MAX_STRING_LEN, "column name")?;
    if !seen.insert(name.clone()) {
        return Err(DecodeError::DuplicateColumn { name, offset });
    }
    Ok((name, offset))
}

/// Decodes a frame payload against its schema type.
pub(crate) fn decode_frame(reader: &mut Reader<'_>, ty: &FrameType, depth: usize) -> Result<Value, DecodeError> {
    let depth = enter(depth, reader)?;
    let rows = reader.read_count(MAX_FRAME_ROWS, "frame rows")?;
    let cols_offset = reader.position();
    let cols = reader.read_count(MAX_FRAME_COLUMNS, "frame columns")?;
    trace!(rows, cols, "frame");
    if cols != ty.columns.len() {
        return Err(DecodeError::ColumnMismatch {
            context: "frame column count",
            expected: ty.columns.len().to_string(),
            found: cols.to_string(),
            offset: cols_offset,
        });
    }

    let mut seen = FxHashSet::default();
    let mut columns = Vec::with_capacity(cols);
    for col_ty in &ty.columns {
        let (name, name_offset) = read_column_name(reader, &mut seen)?;
        if name != col_ty.name {
            return Err(DecodeError::ColumnMismatch {
                context: "frame column name",
                expected: col_ty.name.clone(),
                found: name,
                offset: name_offset,
            });
        }

        let tag_offset = reader.position();
        let wire = read_tag(reader, "column tag")?;
        let expected = TypeTag::for_type(&col_ty.ty);
        if expected != Some(wire.tag) {
            return Err(DecodeError::TagMismatch {
                expected: expected.map(TypeTag::name).unwrap_or("resolved type"),
                found: wire.to_byte(),
                offset: tag_offset,
            });
        }
        if let TypeDescriptor::FixedBytes(size) = col_ty.ty {
            let size_offset = reader.position();
            let found = reader.read_count(MAX_BYTES_LEN, "fixed_bytes size")?;
            if found != size {
                return Err(DecodeError::FixedSizeMismatch {
                    expected: size,
                    found,
                    offset: size_offset,
                });
            }
        }

        let layout = read_column_layout(reader, rows, wire.tag, col_ty.constraints.nullable, &name)?;
        let values = read_cells(reader, rows, &layout, |reader| match &col_ty.ty {
            TypeDescriptor::FixedBytes(size) => Ok(Value::Bytes(reader.read_bytes(*size, "fixed_bytes")?.to_vec())),
            cell_ty if wire.tag.is_compound() => decode_value(reader, cell_ty, false, depth),
            cell_ty => decode_payload(reader, cell_ty, wire.packed, depth),
        })?;
        columns.push(FrameColumn::new(name, values));
    }

    Frame::new(rows, columns)
        .map(Value::Frame)
        .map_err(|e| DecodeError::ColumnMismatch {
            context: "frame",
            expected: "equal-length unique columns".to_string(),
            found: e.to_string(),
            offset: reader.position(),
        })
}

/// Decodes a frame payload without a schema.
pub(crate) fn decode_frame_dynamic(reader: &mut Reader<'_>, depth: usize) -> Result<Value, DecodeError> {
    let depth = enter(depth, reader)?;
    let rows = reader.read_count(MAX_FRAME_ROWS, "frame rows")?;
    let cols = reader.read_collection_len(MAX_FRAME_COLUMNS, 3, "frame columns")?;

    let mut seen = FxHashSet::default();
    let mut columns = Vec::with_capacity(cols);
    for _ in 0..cols {
        let (name, _) = read_column_name(reader, &mut seen)?;
        let wire = read_tag(reader, "column tag")?;
        let fixed_size = if wire.tag == TypeTag::FixedBytes {
            Some(reader.read_count(MAX_BYTES_LEN, "fixed_bytes size")?)
        } else {
            None
        };

        let layout = read_column_layout(reader, rows, wire.tag, true, &name)?;
        let values = read_cells(reader, rows, &layout, |reader| {
            if let Some(size) = fixed_size {
                return Ok(Value::Bytes(reader.read_bytes(size, "fixed_bytes")?.to_vec()));
            }
            if wire.tag.is_compound() {
                let offset = reader.position();
                let value = decode_dynamic_value(reader, depth)?;
                if TypeTag::of(&value) != wire.tag {
                    return Err(DecodeError::TagMismatch {
                        expected: wire.tag.name(),
                        found: TypeTag::of(&value) as u8,
                        offset,
                    });
                }
                return Ok(value);
            }
            decode_scalar(reader, wire.tag, wire.packed)
        })?;
        columns.push(FrameColumn::new(name, values));
    }

    Frame::new(rows, columns)
        .map(Value::Frame)
        .map_err(|e| DecodeError::ColumnMismatch {
            context: "frame",
            expected: "equal-length unique columns".to_string(),
            found: e.to_string(),
            offset: reader.position(),
        })
}
