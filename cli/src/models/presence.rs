use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{DemoError, DemoResult};

/// Ordered (city, company) pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityCompanyTable {
    pub pairs: Vec<(String, String)>,
}

impl CityCompanyTable {
    /// Zip two parallel columns; lengths must match.
    pub fn from_columns<S: AsRef<str>>(cities: &[S], companies: &[S]) -> DemoResult<Self> {
        if cities.len() != companies.len() {
            return Err(DemoError::invalid(format!(
                "city column has {} rows but company column has {}",
                cities.len(),
                companies.len()
            )));
        }

        let pairs = cities
            .iter()
            .zip(companies)
            .map(|(city, company)| (city.as_ref().to_string(), company.as_ref().to_string()))
            .collect();

        Ok(Self { pairs })
    }

    /// Kyiv/Odesa/Kharkiv/Lviv sample used by the `presence` command.
    pub fn sample() -> Self {
        let cities = ["Kyiv", "Kyiv", "Odesa", "Kharkiv", "Lviv"];
        let companies = ["Luxoft", "GlobalLogic", "Luxoft", "EPAM", "Luxoft"];
        Self {
            pairs: cities
                .iter()
                .zip(companies.iter())
                .map(|(city, company)| (city.to_string(), company.to_string()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for CityCompanyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let city_width = self
            .pairs
            .iter()
            .map(|(city, _)| city.len())
            .chain(std::iter::once("city".len()))
            .max()
            .unwrap_or(4);
        let index_width = self.pairs.len().saturating_sub(1).to_string().len();

        writeln!(f, "{:index_width$}  {:<city_width$}  company", "", "city")?;
        for (idx, (city, company)) in self.pairs.iter().enumerate() {
            write!(f, "{:<index_width$}  {:<city_width$}  {}", idx, city, company)?;
            if idx + 1 < self.pairs.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// City × company count matrix. Labels are sorted; absent pairs count 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceMatrix {
    pub cities: Vec<String>,
    pub companies: Vec<String>,
    pub counts: Vec<Vec<u64>>, // [city][company]
}

impl PresenceMatrix {
    pub fn from_table(table: &CityCompanyTable) -> Self {
        let cities: BTreeSet<&str> = table.pairs.iter().map(|(c, _)| c.as_str()).collect();
        let companies: BTreeSet<&str> = table.pairs.iter().map(|(_, c)| c.as_str()).collect();

        let city_index: BTreeMap<&str, usize> =
            cities.iter().enumerate().map(|(i, c)| (*c, i)).collect();
        let company_index: BTreeMap<&str, usize> =
            companies.iter().enumerate().map(|(i, c)| (*c, i)).collect();

        let mut counts = vec![vec![0u64; companies.len()]; cities.len()];
        for (city, company) in &table.pairs {
            counts[city_index[city.as_str()]][company_index[company.as_str()]] += 1;
        }

        Self {
            cities: cities.into_iter().map(String::from).collect(),
            companies: companies.into_iter().map(String::from).collect(),
            counts,
        }
    }

    /// Count for one pair; unknown labels count 0.
    pub fn count(&self, city: &str, company: &str) -> u64 {
        match (self.city_position(city), self.company_position(company)) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    /// Row of counts for `city`, keyed by company.
    pub fn row(&self, city: &str) -> Option<BTreeMap<&str, u64>> {
        let r = self.city_position(city)?;
        Some(
            self.companies
                .iter()
                .map(String::as_str)
                .zip(self.counts[r].iter().copied())
                .collect(),
        )
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    fn city_position(&self, city: &str) -> Option<usize> {
        self.cities.binary_search_by(|c| c.as_str().cmp(city)).ok()
    }

    fn company_position(&self, company: &str) -> Option<usize> {
        self.companies
            .binary_search_by(|c| c.as_str().cmp(company))
            .ok()
    }
}

impl fmt::Display for PresenceMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self
            .cities
            .iter()
            .map(String::len)
            .chain(["city".len(), "company".len()])
            .max()
            .unwrap_or(7);
        let widths: Vec<usize> = self.companies.iter().map(|c| c.len().max(1)).collect();

        write!(f, "{:<label_width$}", "company")?;
        for (company, width) in self.companies.iter().zip(&widths) {
            write!(f, "  {:>width$}", company, width = *width)?;
        }
        writeln!(f)?;
        write!(f, "{:<label_width$}", "city")?;

        for (city, row) in self.cities.iter().zip(&self.counts) {
            writeln!(f)?;
            write!(f, "{:<label_width$}", city)?;
            for (count, width) in row.iter().zip(&widths) {
                write!(f, "  {:>width$}", count, width = *width)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_columns_rejects_length_mismatch() {
        let err = CityCompanyTable::from_columns(&["Kyiv", "Lviv"], &["EPAM"]).unwrap_err();
        assert!(matches!(err, DemoError::InvalidInput(_)));
    }

    #[test]
    fn test_sample_matrix_counts() {
        let matrix = PresenceMatrix::from_table(&CityCompanyTable::sample());

        assert_eq!(matrix.cities, vec!["Kharkiv", "Kyiv", "Lviv", "Odesa"]);
        assert_eq!(matrix.companies, vec!["EPAM", "GlobalLogic", "Luxoft"]);

        let kyiv = matrix.row("Kyiv").unwrap();
        assert_eq!(kyiv["Luxoft"], 1);
        assert_eq!(kyiv["GlobalLogic"], 1);
        assert_eq!(kyiv["EPAM"], 0);

        assert_eq!(matrix.count("Odesa", "Luxoft"), 1);
        assert_eq!(matrix.count("Odesa", "EPAM"), 0);
        assert_eq!(matrix.count("Dnipro", "Luxoft"), 0);
        assert_eq!(matrix.total(), 5);
    }

    #[test]
    fn test_repeated_pairs_accumulate() {
        let table = CityCompanyTable::from_columns(
            &["Lviv", "Lviv", "Lviv"],
            &["EPAM", "EPAM", "Luxoft"],
        )
        .unwrap();
        let matrix = PresenceMatrix::from_table(&table);
        assert_eq!(matrix.count("Lviv", "EPAM"), 2);
        assert_eq!(matrix.total(), table.len() as u64);
    }

    #[test]
    fn test_empty_table_gives_empty_matrix() {
        let table = CityCompanyTable::from_columns::<&str>(&[], &[]).unwrap();
        let matrix = PresenceMatrix::from_table(&table);
        assert!(matrix.cities.is_empty());
        assert_eq!(matrix.total(), 0);
    }

    #[test]
    fn test_display_lists_every_city() {
        let rendered = PresenceMatrix::from_table(&CityCompanyTable::sample()).to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2 + 4);
        assert!(lines[0].starts_with("company"));
        assert!(lines[0].contains("GlobalLogic"));
        assert!(lines[3].starts_with("Kyiv"));
    }
}
