pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

/// Fails with `CorruptIndex` for the given record unless the condition holds.
#[macro_export]
macro_rules! verify_index {
    ($record:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_index(result, $record as u64, stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_index(predicate: bool, record: u64, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        corrupt_index(record, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn corrupt_index(record: u64, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::CorruptIndex {
        record,
        message: condition.to_string(),
    }
    .into())
}
