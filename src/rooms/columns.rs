//! Column role resolution: which header column holds which field.
//!
//! Each role has one resolver rule. A rule first looks for a header equal to its exact title,
//! then for the first header accepted by its substring predicate. Rules are independent of each
//! other, so two roles may resolve to the same column.

use crate::rooms::normalize_cell;

/// Logical columns the extractor reads
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Object,
    Tenant,
    Contract,
    Rent,
    Status,
    Area,
    ContractArea,
}

struct ResolverRule {
    role: ColumnRole,
    exact: &'static str,
    /// Tested against the lowercased header text
    fallback: fn(&str) -> bool,
}

fn mentions_contract(header: &str) -> bool {
    header.contains("догов") || header.contains("по дог")
}

fn is_object(header: &str) -> bool {
    header.contains("объект")
}

fn is_tenant(header: &str) -> bool {
    header.contains("контраг") || header.contains("арендатор")
}

fn is_rent(header: &str) -> bool {
    header.contains("сумм") || header.contains("плата")
}

fn is_status(header: &str) -> bool {
    header.contains("статус")
}

fn is_area(header: &str) -> bool {
    header.contains("площад") && !mentions_contract(header)
}

fn is_contract_area(header: &str) -> bool {
    header.contains("площад") && mentions_contract(header)
}

// Contract column is only ever found by its exact title
fn never(_: &str) -> bool {
    false
}

const RULES: [ResolverRule; 7] = [
    ResolverRule { role: ColumnRole::Object, exact: "Объект недвижимости", fallback: is_object },
    ResolverRule { role: ColumnRole::Tenant, exact: "Контрагент", fallback: is_tenant },
    ResolverRule { role: ColumnRole::Contract, exact: "Договор", fallback: never },
    ResolverRule { role: ColumnRole::Rent, exact: "Сумма", fallback: is_rent },
    ResolverRule { role: ColumnRole::Status, exact: "Статус", fallback: is_status },
    ResolverRule { role: ColumnRole::Area, exact: "Площадь", fallback: is_area },
    ResolverRule { role: ColumnRole::ContractArea, exact: "Площадь по договору", fallback: is_contract_area },
];

impl ResolverRule {
    fn resolve(&self, headers: &[String], lowercase: &[String]) -> Option<usize> {
        headers
            .iter()
            .position(|header| header == self.exact)
            .or_else(|| {
                lowercase
                    .iter()
                    .position(|header| !header.is_empty() && (self.fallback)(header))
            })
    }
}

/// Resolved column index per role
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap {
    object: Option<usize>,
    tenant: Option<usize>,
    contract: Option<usize>,
    rent: Option<usize>,
    status: Option<usize>,
    area: Option<usize>,
    contract_area: Option<usize>,
}

impl ColumnMap {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Object => self.object,
            ColumnRole::Tenant => self.tenant,
            ColumnRole::Contract => self.contract,
            ColumnRole::Rent => self.rent,
            ColumnRole::Status => self.status,
            ColumnRole::Area => self.area,
            ColumnRole::ContractArea => self.contract_area,
        }
    }

    fn set(&mut self, role: ColumnRole, index: Option<usize>) {
        let slot = match role {
            ColumnRole::Object => &mut self.object,
            ColumnRole::Tenant => &mut self.tenant,
            ColumnRole::Contract => &mut self.contract,
            ColumnRole::Rent => &mut self.rent,
            ColumnRole::Status => &mut self.status,
            ColumnRole::Area => &mut self.area,
            ColumnRole::ContractArea => &mut self.contract_area,
        };
        *slot = index;
    }
}

/// Applies every resolver rule to a header row
pub fn resolve_columns(header: &[Option<String>]) -> ColumnMap {
    let headers: Vec<String> = header
        .iter()
        .map(|cell| normalize_cell(cell.as_deref()).to_owned())
        .collect();
    let lowercase: Vec<String> = headers.iter().map(|header| header.to_lowercase()).collect();

    let mut columns = ColumnMap::default();
    for rule in &RULES {
        columns.set(rule.role, rule.resolve(&headers, &lowercase));
    }
    columns
}
