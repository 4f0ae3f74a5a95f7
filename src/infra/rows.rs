//! Filepath: src/infra/rows.rs
//! Pipe-delimited record parsing for transaction and seed files.

use crate::error::SiftError;

/// Field delimiter shared by input, seed and output files.
pub const DELIMITER: char = '|';

/// Fixed field order of transaction input rows.
pub const INPUT_HEADERS: [&str; 9] = [
    "entry_date",
    "TRANS_TYPE",
    "COMPARISON_FIELD",
    "SYS_ID",
    "GEN_DATE",
    "TRANS_system",
    "TRANS_amount",
    "acc_bal",
    "_NAME_",
];

/// Fields written for accepted rows, in output order.
pub const OUTPUT_HEADERS: [&str; 5] =
    ["COMPARISON_FIELD", "TRANS_amount", "TRANS_system", "_NAME_", "entry_date"];

/// Seed file header; only `t_desc` is consumed.
pub const SEED_HEADERS: [&str; 4] = ["t_desc", "tag_name", "counter_party", "avg"];

/// Split a raw line into trimmed fields.
/// Some exports emit `|?` as a separator; it is folded into `|`.
pub fn split_fields(line: &str) -> Vec<String>
{
    line.replace("|?", "|")
        .split(DELIMITER)
        .map(|f| f.trim().to_string())
        .collect()
}

/// One parsed transaction row.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow
{
    pub entry_date: String,
    pub trans_type: String,
    pub narrative: String,
    pub sys_id: String,
    pub gen_date: String,
    pub trans_system: String,
    pub amount_text: String,
    pub amount: f64,
    pub acc_bal: String,
    pub name: String,
}

impl TransactionRow
{
    /// Build a row from split fields. `line` is the 1-based source line,
    /// used only for error reporting. Extra trailing fields are ignored.
    pub fn from_fields(
        line: usize,
        fields: Vec<String>,
    ) -> Result<Self, SiftError>
    {
        if fields.len() < INPUT_HEADERS.len()
        {
            return Err(SiftError::malformed(
                line,
                format!("expected {} fields, found {}", INPUT_HEADERS.len(), fields.len()),
            ));
        }

        let mut it = fields.into_iter();
        let mut next = || it.next().unwrap_or_default();

        let entry_date = next();
        let trans_type = next();
        let narrative = next();
        let sys_id = next();
        let gen_date = next();
        let trans_system = next();
        let amount_text = next();
        let acc_bal = next();
        let name = next();

        let amount = amount_text
            .parse::<f64>()
            .map_err(|e| SiftError::malformed(line, format!("TRANS_amount '{amount_text}': {e}")))?;

        Ok(Self {
            entry_date,
            trans_type,
            narrative,
            sys_id,
            gen_date,
            trans_system,
            amount_text,
            amount,
            acc_bal,
            name,
        })
    }

    /// Year component of `entry_date` (text before the first `/`).
    pub fn entry_year(&self) -> Option<i32>
    {
        self.entry_date
            .split('/')
            .next()
            .and_then(|y| y.trim().parse().ok())
    }

    /// Fields in [`OUTPUT_HEADERS`] order.
    pub fn project(&self) -> [&str; 5]
    {
        [
            self.narrative.as_str(),
            self.amount_text.as_str(),
            self.trans_system.as_str(),
            self.name.as_str(),
            self.entry_date.as_str(),
        ]
    }
}
