// Tuple Implementation
//
// A tuple is one row of values laid out positionally against a Schema.

use std::fmt;
use std::sync::Arc;

use crate::catalog::schema::{Schema, SchemaRef};
use crate::query::executor::result::{DataValue, QueryError, QueryResult};

/// One row of typed field values
#[derive(Debug, Clone)]
pub struct Tuple {
    /// Schema the values conform to
    schema: SchemaRef,
    /// Values in field order
    values: Vec<DataValue>,
}

impl Tuple {
    /// Create a tuple, checking arity and field types against `schema`
    pub fn new(schema: SchemaRef, values: Vec<DataValue>) -> QueryResult<Self> {
        if values.len() != schema.len() {
            return Err(QueryError::TypeError(format!(
                "tuple has {} values, but schema expects {}",
                values.len(),
                schema.len()
            )));
        }

        for (i, value) in values.iter().enumerate() {
            check_field(&schema, i, value)?;
        }

        Ok(Tuple { schema, values })
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn values(&self) -> &[DataValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at position `i`
    pub fn get(&self, i: usize) -> Option<&DataValue> {
        self.values.get(i)
    }

    /// Value of the field called `name`
    pub fn get_by_name(&self, name: &str) -> QueryResult<&DataValue> {
        let i = self.schema.index_of(name)?;
        Ok(&self.values[i])
    }

    /// Replace the value at position `i`
    pub fn set(&mut self, i: usize, value: DataValue) -> QueryResult<()> {
        if i >= self.values.len() {
            return Err(QueryError::ColumnNotFound(format!(
                "field index {} out of range for tuple with {} fields", i, self.values.len()
            )));
        }
        check_field(&self.schema, i, &value)?;
        self.values[i] = value;
        Ok(())
    }

    /// Concatenate `left` and `right` into a tuple over the merged schema
    pub fn merge(left: &Tuple, right: &Tuple) -> Tuple {
        let schema = Arc::new(Schema::merge(&left.schema, &right.schema));
        Self::merge_into(schema, left, right)
    }

    /// Like [`Tuple::merge`], reusing an already merged schema.
    ///
    /// Join operators compute the merged schema once; `schema` must equal
    /// `Schema::merge(left.schema(), right.schema())`.
    pub(crate) fn merge_into(schema: SchemaRef, left: &Tuple, right: &Tuple) -> Tuple {
        let mut values = Vec::with_capacity(left.len() + right.len());
        values.extend(left.values.iter().cloned());
        values.extend(right.values.iter().cloned());
        debug_assert_eq!(values.len(), schema.len());
        Tuple { schema, values }
    }
}

fn check_field(schema: &Schema, i: usize, value: &DataValue) -> QueryResult<()> {
    let field_type = schema.field_type(i)?;
    if value.conforms_to(&field_type) {
        Ok(())
    } else {
        Err(QueryError::TypeError(format!(
            "value {} does not conform to field {} of type {}",
            value,
            schema.field_name(i)?,
            field_type
        )))
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
            && self.schema.len() == other.schema.len()
            && self
                .schema
                .columns()
                .iter()
                .zip(other.schema.columns())
                .all(|(a, b)| a.data_type() == b.data_type())
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}
