use crate::error::{Error, Result};
use crate::protocol::column::ColumnType;
use crate::type_info::MySqlTypeInfo;
use crate::value::MySqlValue;

/// The values bound to the parameters of a prepared statement.
///
/// ```
/// use mysql_wire::MySqlArguments;
///
/// let mut arguments = MySqlArguments::new();
/// arguments.add(7_i64);
/// arguments.add("Joannis");
/// arguments.add(Option::<i64>::None);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MySqlArguments {
    values: Vec<MySqlValue>,
}

impl MySqlArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the next parameter value.
    pub fn add(&mut self, value: impl Into<MySqlValue>) -> &mut Self {
        self.values.push(value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn values(&self) -> &[MySqlValue] {
        &self.values
    }

    /// Checks the bound values against a statement's declared parameters.
    ///
    /// Runs before anything is written to the wire: the count must match
    /// and each value must be assignable to the parameter's type.
    pub(crate) fn check(&self, parameters: &[MySqlTypeInfo]) -> Result<()> {
        if self.values.len() > parameters.len() {
            return Err(Error::TooManyParametersBound);
        }

        if self.values.len() < parameters.len() {
            return Err(Error::NotEnoughParametersBound);
        }

        for (value, parameter) in self.values.iter().zip(parameters) {
            if !is_assignable(value, parameter) {
                return Err(Error::InvalidTypeBound {
                    given: value.kind(),
                    expected: parameter.name().to_owned(),
                });
            }
        }

        Ok(())
    }
}

impl<V: Into<MySqlValue>> FromIterator<V> for MySqlArguments {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// The fixed compatibility table between a bound value and the declared
/// parameter type.
///
/// NULL binds anywhere; parameters the server declares as strings (which
/// includes the common `VAR_STRING` placeholder type) accept anything,
/// as the server will coerce.
fn is_assignable(value: &MySqlValue, parameter: &MySqlTypeInfo) -> bool {
    if value.is_null() {
        return true;
    }

    match parameter.ty {
        ColumnType::Tiny
        | ColumnType::Short
        | ColumnType::Long
        | ColumnType::Int24
        | ColumnType::LongLong
        | ColumnType::Year
        | ColumnType::Bit => {
            matches!(value, MySqlValue::Int(_) | MySqlValue::UInt(_))
        }

        ColumnType::Float
        | ColumnType::Double
        | ColumnType::Decimal
        | ColumnType::NewDecimal => matches!(
            value,
            MySqlValue::Float(_) | MySqlValue::Int(_) | MySqlValue::UInt(_)
        ),

        ColumnType::Date => matches!(
            value,
            MySqlValue::Date(_) | MySqlValue::DateTime(_) | MySqlValue::Text(_)
        ),

        ColumnType::Time => matches!(value, MySqlValue::Time(_) | MySqlValue::Text(_)),

        ColumnType::Datetime | ColumnType::Timestamp => matches!(
            value,
            MySqlValue::DateTime(_) | MySqlValue::Date(_) | MySqlValue::Text(_)
        ),

        // string and blob parameters take anything; NULL-typed parameters
        // are the server saying it does not know, so we do not second-guess
        ColumnType::Null
        | ColumnType::VarChar
        | ColumnType::VarString
        | ColumnType::String
        | ColumnType::Enum
        | ColumnType::Set
        | ColumnType::Json
        | ColumnType::TinyBlob
        | ColumnType::MediumBlob
        | ColumnType::LongBlob
        | ColumnType::Blob
        | ColumnType::Geometry => true,
    }
}

#[cfg(test)]
mod tests {
    use super::MySqlArguments;
    use crate::error::Error;
    use crate::protocol::column::{ColumnFlags, ColumnType};
    use crate::type_info::MySqlTypeInfo;

    fn parameter(ty: ColumnType, flags: ColumnFlags) -> MySqlTypeInfo {
        MySqlTypeInfo {
            ty,
            flags,
            charset: 0x21,
            max_size: 0,
            decimals: 0,
        }
    }

    #[test]
    fn count_mismatch() {
        let mut arguments = MySqlArguments::new();
        arguments.add(1_i64);

        assert!(matches!(
            arguments.check(&[]),
            Err(Error::TooManyParametersBound)
        ));

        let parameters = vec![
            parameter(ColumnType::Long, ColumnFlags::empty()),
            parameter(ColumnType::Long, ColumnFlags::empty()),
        ];

        assert!(matches!(
            arguments.check(&parameters),
            Err(Error::NotEnoughParametersBound)
        ));
    }

    #[test]
    fn string_does_not_bind_to_unsigned_int() {
        let mut arguments = MySqlArguments::new();
        arguments.add("abc");

        let parameters = vec![parameter(ColumnType::Long, ColumnFlags::UNSIGNED)];

        match arguments.check(&parameters) {
            Err(Error::InvalidTypeBound { given, expected }) => {
                assert_eq!(given, "string");
                assert_eq!(expected, "INT UNSIGNED");
            }

            other => panic!("expected InvalidTypeBound, got {other:?}"),
        }
    }

    #[test]
    fn null_binds_anywhere() {
        let mut arguments = MySqlArguments::new();
        arguments.add(Option::<i64>::None);

        let parameters = vec![parameter(ColumnType::Long, ColumnFlags::UNSIGNED)];

        assert!(arguments.check(&parameters).is_ok());
    }
}
