/// Two-member discriminator, passed explicitly into the SQL builder rather
/// than threaded through a global (§9 "Dialect selection").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn is_postgres(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// The placeholder for the `n`th bound parameter (1-indexed), per §4.B.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", n),
            Dialect::Sqlite => "?".to_owned(),
        }
    }

    /// Conservative per-row cap on bound parameters for a single batched
    /// `INSERT`, driven by the backend's statement parameter limit (§4.D).
    /// SQLite's hard ceiling is 999, but the clamp is specified at 900 to
    /// leave headroom rather than ride the limit exactly.
    pub fn max_bind_parameters(self) -> usize {
        match self {
            Dialect::Postgres => 30_000,
            Dialect::Sqlite => 900,
        }
    }
}
