//! SQL Server grammar versions accepted by the parser.

use std::fmt;
use std::str::FromStr;

use crate::error::LineageError;

/// Grammar variant to parse with, named after the SQL Server compatibility level.
///
/// Constructs introduced in later versions are rejected with a parse error
/// when an earlier version is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SqlVersion {
    Sql80,
    Sql90,
    Sql100,
    Sql110,
    #[default]
    Sql120,
    Sql130,
    Sql140,
}

impl SqlVersion {
    pub const ALL: [SqlVersion; 7] = [
        SqlVersion::Sql80,
        SqlVersion::Sql90,
        SqlVersion::Sql100,
        SqlVersion::Sql110,
        SqlVersion::Sql120,
        SqlVersion::Sql130,
        SqlVersion::Sql140,
    ];

    /// Compatibility level number (80, 90, ... 140)
    pub fn level(self) -> u32 {
        match self {
            SqlVersion::Sql80 => 80,
            SqlVersion::Sql90 => 90,
            SqlVersion::Sql100 => 100,
            SqlVersion::Sql110 => 110,
            SqlVersion::Sql120 => 120,
            SqlVersion::Sql130 => 130,
            SqlVersion::Sql140 => 140,
        }
    }

    /// Common table expressions (`WITH cte AS (...)`)
    pub fn supports_cte(self) -> bool {
        self >= SqlVersion::Sql90
    }

    /// `BEGIN TRY ... END TRY BEGIN CATCH ... END CATCH`
    pub fn supports_try_catch(self) -> bool {
        self >= SqlVersion::Sql90
    }

    pub fn supports_merge(self) -> bool {
        self >= SqlVersion::Sql100
    }

    /// `DECLARE @v INT = <initializer>`
    pub fn supports_declare_initializer(self) -> bool {
        self >= SqlVersion::Sql100
    }

    /// `CREATE OR ALTER PROCEDURE`
    pub fn supports_create_or_alter(self) -> bool {
        self >= SqlVersion::Sql130
    }
}

impl fmt::Display for SqlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sql{}", self.level())
    }
}

impl FromStr for SqlVersion {
    type Err = LineageError;

    /// Accepts `120`, `Sql120` and `sql120`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = match trimmed.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("sql") => &trimmed[3..],
            _ => trimmed,
        };

        SqlVersion::ALL
            .into_iter()
            .find(|v| digits.parse::<u32>().ok() == Some(v.level()))
            .ok_or_else(|| LineageError::UnknownSqlVersion {
                value: s.to_string(),
            })
    }
}
