use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use crate::schema::RecipePart;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

impl Display for ShoppingListLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} {}", self.name, self.amount, self.measurement_unit)
    }
}

/// Sums amounts per ingredient. Lines come out ordered by name, then unit.
pub fn aggregate<'a, I>(parts: I) -> Vec<ShoppingListLine>
where
    I: IntoIterator<Item = &'a RecipePart>,
{
    let mut totals: BTreeMap<(&str, &str), i64> = BTreeMap::new();

    for part in parts {
        *totals
            .entry((part.name.as_str(), part.measurement_unit.as_str()))
            .or_insert(0) += i64::from(part.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListLine {
            name: name.to_string(),
            measurement_unit: measurement_unit.to_string(),
            amount,
        })
        .collect()
}

pub fn render(lines: &[ShoppingListLine]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}
