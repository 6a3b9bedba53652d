//! Filter operations for PostgrestClient

/// Operator for filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,

    /// Not equal to
    Neq,

    /// Is (null, true, false)
    Is,
}

impl FilterOperator {
    /// Convert the operator to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Is => "is",
        }
    }
}

/// A single `column=op.value` condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
    pub negated: bool,
}

impl Filter {
    pub fn new(column: &str, operator: FilterOperator, value: impl ToString) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: value.to_string(),
            negated: false,
        }
    }

    /// Negate the condition (`not.op.value`)
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// The query parameter this filter renders to
    pub fn to_param(&self) -> (String, String) {
        let prefix = if self.negated { "not." } else { "" };
        (
            self.column.clone(),
            format!("{}{}.{}", prefix, self.operator.as_str(), self.value),
        )
    }
}
