//! Table query description, rendered as PostgREST query parameters.

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, String),
    In(&'static str, Vec<String>),
    Gte(&'static str, String),
    Lte(&'static str, String),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl ToString) -> Self {
        Filter::Eq(column, value.to_string())
    }

    pub fn is_in<I, T>(column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Filter::In(column, values.into_iter().map(|v| v.to_string()).collect())
    }

    pub fn gte(column: &'static str, value: impl ToString) -> Self {
        Filter::Gte(column, value.to_string())
    }

    pub fn lte(column: &'static str, value: impl ToString) -> Self {
        Filter::Lte(column, value.to_string())
    }

    pub fn column(&self) -> &'static str {
        match self {
            Filter::Eq(c, _) | Filter::In(c, _) | Filter::Gte(c, _) | Filter::Lte(c, _) => c,
        }
    }

    /// `(column, "op.value")` pair as PostgREST expects it.
    pub fn to_param(&self) -> (&'static str, String) {
        match self {
            Filter::Eq(c, v) => (c, format!("eq.{}", v)),
            Filter::In(c, vs) => (c, format!("in.({})", vs.iter().map(|v| quote_list_item(v)).collect::<Vec<_>>().join(","))),
            Filter::Gte(c, v) => (c, format!("gte.{}", v)),
            Filter::Lte(c, v) => (c, format!("lte.{}", v)),
        }
    }
}

// Values with reserved characters must be double-quoted inside `in.(...)`.
fn quote_list_item(v: &str) -> String {
    if v.chars().any(|c| matches!(c, ',' | '(' | ')' | '"' | ' ')) {
        format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        v.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Default for Query {
    fn default() -> Self {
        Query::select("*")
    }
}

impl Query {
    /// Start a query with the given select list, e.g. `"*,farms(farm_name)"`.
    pub fn select(columns: impl Into<String>) -> Self {
        Query {
            columns: columns.into(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &'static str, value: impl ToString) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn order_asc(mut self, column: &'static str) -> Self {
        self.order.push(Order {
            column,
            descending: false,
        });
        self
    }

    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order.push(Order {
            column,
            descending: true,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("select", self.columns.clone())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.descending { "desc" } else { "asc" }))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order", order));
        }
        if let Some(n) = self.limit {
            params.push(("limit", n.to_string()));
        }
        params
    }
}
