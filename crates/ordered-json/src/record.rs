//! Record (struct) adaptation through a [`FieldPlan`].
//!
//! `#[derive(Marshal)]` implements [`Record`] and `#[derive(Unmarshal)]`
//! implements [`RecordMut`]: a field declaration list plus positional access
//! to each field. The plan then decides which fields appear under which
//! names; this module walks the plan paths through embedded records.

use crate::decoder::{Decoder, Kind};
use crate::error::{JsonError, Result};
use crate::marshal::{Context, Marshal};
use crate::plan::{plan_for, FieldDecl, RecordType};
use crate::unmarshal::Unmarshal;
use crate::value::{Object, Value};

/// Read access to one declared field.
pub enum Field<'a> {
    Value(&'a dyn Marshal),
    /// An embedded record; `None` when an embedded pointer is absent.
    Embedded(Option<&'a dyn Record>),
    Missing,
}

/// Write access to one declared field.
pub enum FieldMut<'a> {
    Value(&'a mut dyn Unmarshal),
    /// An embedded record, allocated on access if it sits behind a pointer.
    Embedded(&'a mut dyn RecordMut),
    Missing,
}

/// Encode view of a record type.
pub trait Record: Marshal + 'static {
    /// Field declarations in declaration order.
    fn declare() -> Vec<FieldDecl>
    where
        Self: Sized;

    fn describe() -> RecordType
    where
        Self: Sized,
    {
        RecordType::new::<Self>(<Self as Record>::declare)
    }

    fn record_type(&self) -> RecordType;

    fn field(&self, index: usize) -> Field<'_>;
}

/// Decode view of a record type.
pub trait RecordMut: Unmarshal + 'static {
    fn declare() -> Vec<FieldDecl>
    where
        Self: Sized;

    fn describe() -> RecordType
    where
        Self: Sized,
    {
        RecordType::new::<Self>(<Self as RecordMut>::declare)
    }

    fn record_type(&self) -> RecordType;

    fn field_mut(&mut self, index: usize) -> FieldMut<'_>;
}

/// Encodes a record as an object following its field plan.
pub fn marshal_record(record: &dyn Record, ctx: &mut Context) -> Result<Value> {
    let plan = plan_for(record.record_type());
    let mut obj = Object::with_capacity(plan.fields().len());

    for field in plan.fields() {
        let value = match resolve(record, &field.path) {
            // An absent embedded pointer hides every field below it.
            None | Some(Field::Missing) => continue,
            Some(Field::Value(v)) => {
                if field.omit_empty && v.is_empty_value() {
                    continue;
                }
                if field.quoted {
                    v.marshal_quoted(ctx)?
                } else {
                    v.marshal(ctx)?
                }
            }
            Some(Field::Embedded(Some(inner))) => inner.marshal(ctx)?,
            Some(Field::Embedded(None)) => {
                if field.omit_empty {
                    continue;
                }
                Value::Null
            }
        };
        obj.push(field.name.clone(), value);
    }
    Ok(Value::Object(obj))
}

fn resolve<'a>(mut record: &'a dyn Record, path: &[usize]) -> Option<Field<'a>> {
    let (&last, parents) = path.split_last()?;
    for &index in parents {
        record = match record.field(index) {
            Field::Embedded(Some(inner)) => inner,
            _ => return None,
        };
    }
    Some(record.field(last))
}

fn resolve_mut<'a>(mut record: &'a mut dyn RecordMut, path: &[usize]) -> Option<FieldMut<'a>> {
    let (&last, parents) = path.split_last()?;
    for &index in parents {
        record = match record.field_mut(index) {
            FieldMut::Embedded(inner) => inner,
            _ => return None,
        };
    }
    Some(record.field_mut(last))
}

/// Decodes an object into a record following its field plan.
///
/// Unknown keys are skipped unless the decoder disallows them. `null` leaves
/// the record unchanged.
pub fn unmarshal_record(record: &mut dyn RecordMut, d: &mut Decoder<'_>) -> Result<()> {
    let record_type = record.record_type();
    match d.peek_kind()? {
        Kind::Null => d.skip().map(drop),
        Kind::Object => {
            let plan = plan_for(record_type);
            d.object(|d, key| {
                let Some(field) = plan.lookup(key) else {
                    if d.options().disallow_unknown_fields {
                        d.save_error(JsonError::UnknownField(key.to_string()));
                    }
                    return d.skip().map(drop);
                };
                d.enter_field(plan.record(), &field.name);
                let result = match resolve_mut(&mut *record, &field.path) {
                    Some(FieldMut::Value(target)) if field.quoted => target.unmarshal_quoted(d),
                    Some(FieldMut::Value(target)) => target.unmarshal(d),
                    Some(FieldMut::Embedded(inner)) => inner.unmarshal(d),
                    None | Some(FieldMut::Missing) => d.skip().map(drop),
                };
                d.leave_field();
                result
            })
        }
        kind => {
            d.skip()?;
            d.type_mismatch(kind.name(), record_type.name());
            Ok(())
        }
    }
}
