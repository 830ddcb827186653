//! In-memory [`Backend`] used by unit tests.
//!
//! Mimics the parts of the hosted service the application relies on: password
//! auth, the sign-up trigger that provisions a FARMER profile, equality/range/
//! `in` filters, ordering, limits, `table(col)` expansion and the
//! `profiles_with_email` view. Failures can be injected per table.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::backend::{Backend, BackendError};
use crate::models::{Identity, ProfileRow, UserId};
use crate::query::{Filter, Query};

pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

struct FakeUser {
    id: UserId,
    email: String,
    password: String,
}

#[derive(Default)]
pub struct FakeBackend {
    users: RefCell<Vec<FakeUser>>,
    tables: RefCell<BTreeMap<String, Vec<Value>>>,
    next_id: Cell<i64>,
    signed_in: Cell<Option<UserId>>,
    failing_sign_in: Cell<bool>,
    failing_selects: RefCell<BTreeSet<String>>,
    failing_inserts: RefCell<BTreeSet<String>>,
    failing_updates: RefCell<BTreeSet<String>>,
    calls: RefCell<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = FakeBackend::default();
        backend.next_id.set(1);
        backend
    }

    pub fn add_user(&self, email: &str, password: &str, role: Option<&str>, full_name: Option<&str>) -> UserId {
        let id = self.add_user_without_profile(email, password);
        self.push_row("profiles", json!({ "id": id, "role": role, "full_name": full_name }));
        id
    }

    pub fn add_user_without_profile(&self, email: &str, password: &str) -> UserId {
        let id = UserId(Uuid::new_v4());
        self.users.borrow_mut().push(FakeUser {
            id,
            email: email.to_string(),
            password: password.to_string(),
        });
        id
    }

    /// Inserts a row as-is, assigning an `id` when absent.
    pub fn push_row(&self, table: &str, mut row: Value) -> Value {
        if let Some(obj) = row.as_object_mut()
            && !obj.contains_key("id")
        {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            obj.insert("id".to_string(), json!(id));
        }
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    pub fn profile(&self, id: UserId) -> Option<ProfileRow> {
        self.rows("profiles")
            .into_iter()
            .find(|r| r["id"] == json!(id))
            .and_then(|r| serde_json::from_value(r).ok())
    }

    pub fn signed_in(&self) -> Option<UserId> {
        self.signed_in.get()
    }

    /// Every later sign-in answers 503, whatever the credentials.
    pub fn fail_sign_in(&self) {
        self.failing_sign_in.set(true);
    }

    pub fn fail_selects_on(&self, table: &str) {
        self.failing_selects.borrow_mut().insert(table.to_string());
    }

    pub fn fail_inserts_on(&self, table: &str) {
        self.failing_inserts.borrow_mut().insert(table.to_string());
    }

    pub fn fail_updates_on(&self, table: &str) {
        self.failing_updates.borrow_mut().insert(table.to_string());
    }

    /// `"<verb> <table>"` for every table call so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, verb: &str, table: &str) {
        self.calls.borrow_mut().push(format!("{} {}", verb, table));
    }

    fn injected(set: &RefCell<BTreeSet<String>>, table: &str) -> Result<(), BackendError> {
        if set.borrow().contains(table) {
            Err(BackendError::Http {
                status: 500,
                message: format!("injected failure on {}", table),
            })
        } else {
            Ok(())
        }
    }

    fn source_rows(&self, table: &str) -> Vec<Value> {
        if table != "profiles_with_email" {
            return self.rows(table);
        }
        let users = self.users.borrow();
        self.rows("profiles")
            .into_iter()
            .map(|mut p| {
                let email = users.iter().find(|u| p["id"] == json!(u.id)).map(|u| u.email.clone());
                if let Some(obj) = p.as_object_mut() {
                    obj.insert("email".to_string(), json!(email));
                }
                p
            })
            .collect()
    }

    fn expand(&self, row: &mut Value, relation: &str, columns: &[&str]) {
        let fk = match relation.strip_suffix("ies") {
            Some(stem) => format!("{}y_id", stem),
            None => format!("{}_id", relation.trim_end_matches('s')),
        };
        let target = row.get(&fk).cloned().unwrap_or(Value::Null);
        let related = self
            .rows(relation)
            .into_iter()
            .find(|r| !target.is_null() && r["id"] == target)
            .map(|r| project(&r, columns))
            .unwrap_or(Value::Null);
        if let Some(obj) = row.as_object_mut() {
            obj.insert(relation.to_string(), related);
        }
    }
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => scalar_text(a).cmp(&scalar_text(b)),
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    let cell = row.get(filter.column()).unwrap_or(&Value::Null);
    let as_value = |s: &str| s.parse::<f64>().map(|n| json!(n)).unwrap_or_else(|_| json!(s));
    match filter {
        Filter::Eq(_, v) => scalar_text(cell) == *v,
        Filter::In(_, vs) => vs.iter().any(|v| scalar_text(cell) == *v),
        Filter::Gte(_, v) => !cell.is_null() && compare(cell, &as_value(v)) != Ordering::Less,
        Filter::Lte(_, v) => !cell.is_null() && compare(cell, &as_value(v)) != Ordering::Greater,
    }
}

fn project(row: &Value, columns: &[&str]) -> Value {
    if columns.contains(&"*") {
        return row.clone();
    }
    let mut out = Map::new();
    for c in columns {
        out.insert(c.to_string(), row.get(*c).cloned().unwrap_or(Value::Null));
    }
    Value::Object(out)
}

/// Splits `"*,farms(farm_name)"` into plain columns and `(relation, columns)`.
fn parse_select(columns: &str) -> (Vec<&str>, Vec<(&str, Vec<&str>)>) {
    let mut plain = Vec::new();
    let mut relations = Vec::new();
    let mut rest = columns;
    while !rest.is_empty() {
        let next_comma = rest.find(',');
        let next_paren = rest.find('(');
        match (next_paren, next_comma) {
            (Some(p), c) if c.is_none_or(|c| p < c) => {
                let close = rest[p..].find(')').map(|i| p + i).unwrap_or(rest.len() - 1);
                let inner = rest[p + 1..close].split(',').map(str::trim).collect();
                relations.push((rest[..p].trim(), inner));
                rest = rest[close + 1..].trim_start_matches(',');
            }
            (_, Some(c)) => {
                plain.push(rest[..c].trim());
                rest = &rest[c + 1..];
            }
            (_, None) => {
                plain.push(rest.trim());
                rest = "";
            }
        }
    }
    (plain, relations)
}

impl Backend for FakeBackend {
    fn sign_in_with_password(&self, email: &str, password: &SecretString) -> Result<Identity, BackendError> {
        if self.failing_sign_in.get() {
            return Err(BackendError::Http {
                status: 503,
                message: "injected sign-in failure".to_string(),
            });
        }
        let users = self.users.borrow();
        let user = users
            .iter()
            .find(|u| u.email == email && u.password == password.expose_secret())
            .ok_or(BackendError::InvalidCredentials)?;
        self.signed_in.set(Some(user.id));
        Ok(Identity {
            id: user.id,
            email: Some(user.email.clone()),
        })
    }

    fn sign_up(&self, email: &str, password: &SecretString) -> Result<Identity, BackendError> {
        if self.users.borrow().iter().any(|u| u.email == email) {
            return Err(BackendError::Http {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let id = self.add_user_without_profile(email, password.expose_secret());
        // provisioning trigger
        self.push_row("profiles", json!({ "id": id, "role": "FARMER", "full_name": null }));
        Ok(Identity {
            id,
            email: Some(email.to_string()),
        })
    }

    fn sign_out(&self) {
        self.signed_in.set(None);
    }

    fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError> {
        self.record("select", table);
        Self::injected(&self.failing_selects, table)?;

        let (plain, relations) = parse_select(&query.columns);
        let mut rows: Vec<Value> = self
            .source_rows(table)
            .into_iter()
            .filter(|r| query.filters.iter().all(|f| matches(r, f)))
            .collect();
        for order in query.order.iter().rev() {
            rows.sort_by(|a, b| {
                let ord = compare(
                    a.get(order.column).unwrap_or(&Value::Null),
                    b.get(order.column).unwrap_or(&Value::Null),
                );
                if order.descending { ord.reverse() } else { ord }
            });
        }
        if let Some(n) = query.limit {
            rows.truncate(n);
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut out = project(&row, &plain);
                for (relation, columns) in &relations {
                    let mut full = row.clone();
                    self.expand(&mut full, relation, columns);
                    if let (Some(obj), Some(v)) = (out.as_object_mut(), full.get(*relation)) {
                        obj.insert(relation.to_string(), v.clone());
                    }
                }
                out
            })
            .collect())
    }

    fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, BackendError> {
        self.record("insert", table);
        Self::injected(&self.failing_inserts, table)?;
        Ok(vec![self.push_row(table, row)])
    }

    fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, BackendError> {
        self.record("update", table);
        Self::injected(&self.failing_updates, table)?;
        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(table.to_string()).or_default();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| filters.iter().all(|f| matches(r, f))) {
            if let (Some(obj), Some(p)) = (row.as_object_mut(), patch.as_object()) {
                for (k, v) in p {
                    obj.insert(k.clone(), v.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select_lists() {
        let (plain, rel) = parse_select("*,farms(farm_name),varieties(name)");
        assert_eq!(plain, vec!["*"]);
        assert_eq!(rel, vec![("farms", vec!["farm_name"]), ("varieties", vec!["name"])]);

        let (plain, rel) = parse_select("role,full_name");
        assert_eq!(plain, vec!["role", "full_name"]);
        assert!(rel.is_empty());
    }

    #[test]
    fn filters_orders_and_expands() {
        let backend = FakeBackend::new();
        let farm = backend.push_row("farms", json!({ "farm_name": "Doi Chang" }));
        backend.push_row("harvest_lots", json!({ "farm_id": farm["id"], "harvest_date": "2024-01-02" }));
        backend.push_row("harvest_lots", json!({ "farm_id": farm["id"], "harvest_date": "2024-03-04" }));
        backend.push_row("harvest_lots", json!({ "farm_id": 999, "harvest_date": "2024-05-06" }));

        let q = Query::select("*,farms(farm_name)")
            .filter(Filter::is_in("farm_id", [farm["id"].as_i64().unwrap()]))
            .order_desc("harvest_date");
        let rows = backend.select("harvest_lots", &q).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["harvest_date"], "2024-03-04");
        assert_eq!(rows[0]["farms"]["farm_name"], "Doi Chang");
    }
}
