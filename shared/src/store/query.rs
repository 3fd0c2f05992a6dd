//! Structured queries and their in-process evaluation.
//!
//! Both backends hand candidate documents to [`Query::run`], so filter
//! matching, ordering and cursor positioning behave the same everywhere.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    ArrayContains,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => values_equal(actual, &self.value),
            FilterOp::NotEq => !values_equal(actual, &self.value),
            FilterOp::ArrayContains => match actual {
                Value::Array(items) => items.iter().any(|item| values_equal(item, &self.value)),
                _ => false,
            },
            // Range filters only match values of the same kind.
            op => {
                if type_rank(actual) != type_rank(&self.value) {
                    return false;
                }
                let ord = compare_values(actual, &self.value);
                match op {
                    FilterOp::Lt => ord == Ordering::Less,
                    FilterOp::Le => ord != Ordering::Greater,
                    FilterOp::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                }
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Desc,
        }
    }
}

/// Exclusive start position: the ordered field values of the last item
/// already seen, plus its id as the final tiebreak.
#[derive(Debug, Clone, PartialEq)]
pub struct StartAfter {
    pub values: Vec<Value>,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub start_after: Option<StartAfter>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(field, value))
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, position: StartAfter) -> Self {
        self.start_after = Some(position);
        self
    }

    /// Positions the query right after `doc` under the current ordering.
    pub fn start_after_document(self, doc: &Document) -> Self {
        let position = StartAfter {
            values: self
                .order_by
                .iter()
                .map(|order| doc.get(&order.field).cloned().unwrap_or(Value::Null))
                .collect(),
            id: doc.id.clone(),
        };
        self.start_after(position)
    }

    /// `field:direction` pairs joined by commas, used to bind cursors to the
    /// ordering they were minted under.
    pub fn order_fingerprint(&self) -> String {
        self.order_by
            .iter()
            .map(|order| format!("{}:{}", order.field, order.direction.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Filters, orders, positions and truncates `docs`.
    ///
    /// Documents missing any ordered field are excluded. Ties are broken by
    /// document id in the direction of the last ordering.
    pub fn run(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.filters.iter().all(|f| f.matches(doc)))
            .filter(|doc| self.order_by.iter().all(|o| doc.get(&o.field).is_some()))
            .collect();

        matched.sort_by(|a, b| self.compare_docs(a, b));

        if let Some(position) = &self.start_after {
            matched.retain(|doc| self.compare_to_position(doc, position) == Ordering::Greater);
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }

    fn tiebreak_direction(&self) -> Direction {
        self.order_by
            .last()
            .map(|order| order.direction)
            .unwrap_or(Direction::Asc)
    }

    fn compare_docs(&self, a: &Document, b: &Document) -> Ordering {
        for order in &self.order_by {
            let ord = compare_values(
                a.get(&order.field).unwrap_or(&Value::Null),
                b.get(&order.field).unwrap_or(&Value::Null),
            );
            let ord = order.direction.apply(ord);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.tiebreak_direction().apply(a.id.cmp(&b.id))
    }

    fn compare_to_position(&self, doc: &Document, position: &StartAfter) -> Ordering {
        for (idx, order) in self.order_by.iter().enumerate() {
            let anchor = position.values.get(idx).unwrap_or(&Value::Null);
            let ord = compare_values(doc.get(&order.field).unwrap_or(&Value::Null), anchor);
            let ord = order.direction.apply(ord);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.tiebreak_direction().apply(doc.id.as_str().cmp(position.id.as_str()))
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    type_rank(a) == type_rank(b) && compare_values(a, b) == Ordering::Equal
}

/// Total order over stored values: null < bool < number < string < array <
/// object, then by value within a kind.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            },
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ord = compare_values(left, right);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        },
        (Value::Object(x), Value::Object(y)) => {
            let mut left: Vec<_> = x.iter().collect();
            let mut right: Vec<_> = y.iter().collect();
            left.sort_by(|p, q| p.0.cmp(q.0));
            right.sort_by(|p, q| p.0.cmp(q.0));
            for ((lk, lv), (rk, rv)) in left.iter().zip(right.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            left.len().cmp(&right.len())
        },
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::Fields;

    fn doc(id: &str, value: Value) -> Document {
        let fields: Fields = match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        Document::new(id, fields)
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    fn sample() -> Vec<Document> {
        vec![
            doc("a", json!({ "createdAt": 30, "status": "active", "tags": ["ai", "text"] })),
            doc("b", json!({ "createdAt": 10, "status": "inactive", "tags": ["image"] })),
            doc("c", json!({ "createdAt": 20, "status": "active" })),
            doc("d", json!({ "status": "active" })),
            doc("e", json!({ "createdAt": 20, "status": "active" })),
        ]
    }

    #[test]
    fn orders_desc_with_id_tiebreak_and_excludes_missing_fields() {
        let query = Query::new().order_by(OrderBy::desc("createdAt"));
        let out = query.run(sample());
        assert_eq!(ids(&out), vec!["a", "e", "c", "b"]);
    }

    #[test]
    fn equality_and_array_contains_filters() {
        let active = Query::new().where_eq("status", "active").run(sample());
        assert_eq!(active.len(), 4);

        let tagged = Query::new()
            .filter(Filter::new("tags", FilterOp::ArrayContains, "text"))
            .run(sample());
        assert_eq!(ids(&tagged), vec!["a"]);
    }

    #[test]
    fn range_filters_do_not_cross_types() {
        let docs = vec![
            doc("n", json!({ "name": 5 })),
            doc("s", json!({ "name": "Alpha" })),
            doc("t", json!({ "name": "Beta" })),
        ];
        let out = Query::new()
            .filter(Filter::new("name", FilterOp::Ge, "A"))
            .filter(Filter::new("name", FilterOp::Lt, "B"))
            .run(docs);
        assert_eq!(ids(&out), vec!["s"]);
    }

    #[test]
    fn start_after_resumes_strictly_after_position() {
        let base = Query::new().order_by(OrderBy::desc("createdAt"));
        let first = base.clone().limit(2).run(sample());
        assert_eq!(ids(&first), vec!["a", "e"]);

        let next = base
            .clone()
            .start_after_document(&first[1])
            .limit(2)
            .run(sample());
        assert_eq!(ids(&next), vec!["c", "b"]);
    }

    #[test]
    fn fingerprint_lists_orderings() {
        let query = Query::new()
            .order_by(OrderBy::desc("createdAt"))
            .order_by(OrderBy::asc("name"));
        assert_eq!(query.order_fingerprint(), "createdAt:desc,name:asc");
    }

    #[test]
    fn cross_type_ordering_is_total() {
        let mut values = vec![json!("x"), json!(3), json!(null), json!([1]), json!(true)];
        values.sort_by(compare_values);
        assert_eq!(values, vec![json!(null), json!(true), json!(3), json!("x"), json!([1])]);
    }
}
