use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("entity `{0}` is not registered")]
    UnknownEntity(String),

    #[error("relationship `{relationship}` on `{entity}` targets unknown entity `{target}`")]
    UnresolvedTarget {
        entity: String,
        relationship: String,
        target: String,
    },

    #[error(
        "relationship `{relationship}` on `{entity}` has an ambiguous foreign key: \
         candidates {candidates:?} all reference `{target}`; supply an explicit fk_column"
    )]
    AmbiguousForeignKey {
        entity: String,
        relationship: String,
        target: String,
        candidates: Vec<String>,
    },

    #[error("relationship `{relationship}` on `{entity}` has no foreign key column referencing `{target}`")]
    MissingForeignKey {
        entity: String,
        relationship: String,
        target: String,
    },

    #[error("operation on `{0}` requires a single primary key column, but none is declared")]
    NoPrimaryKey(String),
}
