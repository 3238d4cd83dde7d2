use core::fmt::{self, Display, Formatter};

/// Errors created by this library
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// A general purpose error
    General(&'static str),
    /// A caller supplied an argument that breaks the operation's contract
    InvalidArgument(String),
    /// A relation mixes elements from different groups
    IncompatibleGroups,
    /// A relation is not linear in its witnesses
    NonLinearRelation(&'static str),
    /// No value was supplied for a named witness
    MissingWitness(String),
    /// The supplied witnesses do not satisfy the relation
    InvalidWitness(String),
    /// A range proof was requested for a value outside its bounds
    ValueOutOfRange {
        /// The value that was committed
        value: i64,
        /// The inclusive lower bound
        lower: i64,
        /// The inclusive upper bound
        upper: i64,
    },
    /// The prover's data does not satisfy a predicate it must prove
    PredicateNotSatisfied(String),
    /// Not enough branches of a policy are satisfied
    PolicyNotSatisfied,
    /// An issuance session was driven out of order
    InvalidIssuanceState(&'static str),
    /// The issuer rejected the issuance request
    IssuanceRejected,
    /// An honestly issued signature failed to verify after unblinding
    IssuanceParameterMismatch,
    /// Invalid signing operation
    InvalidSigningOperation,
    /// A value could not be serialized or deserialized
    Serialization(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::General(s) => write!(f, "{}", s),
            Self::InvalidArgument(s) => write!(f, "invalid argument: {}", s),
            Self::IncompatibleGroups => write!(f, "incompatible groups"),
            Self::NonLinearRelation(s) => write!(f, "relation is not linear: {}", s),
            Self::MissingWitness(w) => write!(f, "missing witness '{}'", w),
            Self::InvalidWitness(s) => write!(f, "invalid witness: {}", s),
            Self::ValueOutOfRange {
                value,
                lower,
                upper,
            } => write!(f, "value {} is not in [{}, {}]", value, lower, upper),
            Self::PredicateNotSatisfied(s) => write!(f, "predicate not satisfied: {}", s),
            Self::PolicyNotSatisfied => write!(f, "policy not satisfied"),
            Self::InvalidIssuanceState(s) => write!(f, "invalid issuance state: {}", s),
            Self::IssuanceRejected => write!(f, "issuance rejected"),
            Self::IssuanceParameterMismatch => {
                write!(f, "unblinded signature does not verify")
            }
            Self::InvalidSigningOperation => write!(f, "invalid signing operation"),
            Self::Serialization(s) => write!(f, "serialization error: {}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_bare::error::Error> for Error {
    fn from(e: serde_bare::error::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
