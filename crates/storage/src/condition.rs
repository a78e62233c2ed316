use colloboque_core::{BinaryCondition, RangeCondition, RangePred, Value};
use rusqlite::types::Value as SqlValue;

/// A SQL boolean expression with its positional parameters.
///
/// Terms are joined with AND; a predicate without terms is always true.
/// Parameters appear in the same order as their `?` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<String>,
    params: Vec<SqlValue>,
}

impl Predicate {
    pub fn always_true() -> Self {
        Self::default()
    }

    pub fn is_always_true(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn and(mut self, other: Predicate) -> Self {
        self.terms.extend(other.terms);
        self.params.extend(other.params);
        self
    }

    fn term(sql: String, params: Vec<SqlValue>) -> Self {
        Self {
            terms: vec![sql],
            params,
        }
    }

    pub fn sql(&self) -> String {
        if self.terms.is_empty() {
            "1".to_string()
        } else {
            self.terms.join(" AND ")
        }
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn into_params(self) -> Vec<SqlValue> {
        self.params
    }
}

pub trait ToPredicate {
    fn to_predicate(&self) -> Predicate;
}

impl ToPredicate for BinaryCondition {
    fn to_predicate(&self) -> Predicate {
        Predicate::term(
            format!("{} {} ?", quote_ident(&self.column), self.pred.sql_operator()),
            vec![to_sql_value(&self.value)],
        )
    }
}

impl ToPredicate for RangeCondition {
    fn to_predicate(&self) -> Predicate {
        if self.values.is_empty() {
            // Nothing is IN an empty set; everything is NOT IN it.
            let sql = match self.pred {
                RangePred::In => "0",
                RangePred::NotIn => "1",
            };
            return Predicate::term(sql.to_string(), Vec::new());
        }
        let keyword = match self.pred {
            RangePred::In => "IN",
            RangePred::NotIn => "NOT IN",
        };
        let placeholders = vec!["?"; self.values.len()].join(", ");
        Predicate::term(
            format!("{} {keyword} ({placeholders})", quote_ident(&self.column)),
            self.values.iter().map(to_sql_value).collect(),
        )
    }
}

/// Folds conditions left to right with AND, starting from always-true.
pub fn build<C: ToPredicate>(conditions: &[C]) -> Predicate {
    conditions
        .iter()
        .fold(Predicate::always_true(), |acc, c| acc.and(c.to_predicate()))
}

/// Lower-cases an identifier and quotes it for SQLite.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.to_lowercase().replace('"', "\"\""))
}

pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Float(x) => SqlValue::Real(*x),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloboque_core::BinaryPred;

    #[test]
    fn empty_list_is_always_true() {
        let p = build::<BinaryCondition>(&[]);
        assert!(p.is_always_true());
        assert_eq!(p.sql(), "1");
        assert!(p.params().is_empty());
    }

    #[test]
    fn binary_conditions_fold_with_and() {
        let p = build(&[
            BinaryCondition::equals("ID", "1"),
            BinaryCondition::new("completion", BinaryPred::Ge, 50i64),
            BinaryCondition::new("num", BinaryPred::Lt, 3i64),
        ]);
        assert_eq!(p.sql(), r#""id" = ? AND "completion" >= ? AND "num" < ?"#);
        assert_eq!(
            p.params(),
            &[
                SqlValue::Text("1".into()),
                SqlValue::Integer(50),
                SqlValue::Integer(3)
            ]
        );
    }

    #[test]
    fn membership_renders_placeholders_per_value() {
        let p = build(&[RangeCondition::new("id", RangePred::NotIn, ["1", "2"])]);
        assert_eq!(p.sql(), r#""id" NOT IN (?, ?)"#);
        assert_eq!(p.params().len(), 2);
    }

    #[test]
    fn empty_membership_sets() {
        let none: [&str; 0] = [];
        assert_eq!(build(&[RangeCondition::new("id", RangePred::In, none)]).sql(), "0");
        assert_eq!(build(&[RangeCondition::new("id", RangePred::NotIn, none)]).sql(), "1");
    }

    #[test]
    fn and_keeps_parameter_order() {
        let p = build(&[BinaryCondition::equals("a", 1i64)])
            .and(build(&[RangeCondition::new("b", RangePred::In, [2i64, 3])]));
        assert_eq!(p.sql(), r#""a" = ? AND "b" IN (?, ?)"#);
        assert_eq!(
            p.into_params(),
            vec![SqlValue::Integer(1), SqlValue::Integer(2), SqlValue::Integer(3)]
        );
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }
}
