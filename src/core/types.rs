use std::fmt::Display;

/// Sort rank of a column type. This is not a byte alignment: the ranks
/// follow `pg_type.typalign` but additionally split variable-length types
/// into values that may be stored out of line or long (`Varlena`) and values
/// provably short enough for the 1-byte varlena header (`Char`).
///
/// Declaration order is the rank order; higher ranks are placed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlignmentClass {
    /// No alignment requirement (`typalign = 'c'`, short varlena values).
    Char = 1,
    /// 2-byte alignment.
    Short = 2,
    /// Variable-length values of unknown or large size.
    Varlena = 3,
    /// 4-byte alignment.
    Int = 4,
    /// 8-byte alignment.
    Double = 8,
}

impl AlignmentClass {
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Maps a catalog `typalign` code. Unknown codes need no alignment.
    pub fn from_typalign(code: char) -> Self {
        match code {
            's' => AlignmentClass::Short,
            'i' => AlignmentClass::Int,
            'd' => AlignmentClass::Double,
            _ => AlignmentClass::Char,
        }
    }
}

impl Display for AlignmentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rank())
    }
}
