//! Rendering of compiled query plans into parameterised PostgreSQL.
//!
//! Column and table names come from the entity descriptor tables, never
//! from request input; every value travels as a `$n` bind parameter along
//! with the column kind so `NULL` binds carry the right SQL type.

use std::fmt::Write as _;

use crate::domain::entity::{Entity, EntityField, EntityId, FieldKind, FieldValue};
use crate::domain::filter::{Clause, Op, Predicate, QueryPlan};

/// One bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bind {
    pub kind: FieldKind,
    pub value: FieldValue,
}

/// Statement text plus its ordered bind parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlStatement {
    pub text: String,
    pub binds: Vec<Bind>,
}

#[derive(Default)]
struct Builder {
    text: String,
    binds: Vec<Bind>,
}

impl Builder {
    fn push(&mut self, fragment: &str) -> &mut Self {
        self.text.push_str(fragment);
        self
    }

    fn bind(&mut self, kind: FieldKind, value: FieldValue) -> &mut Self {
        self.binds.push(Bind { kind, value });
        let _ = write!(self.text, "${}", self.binds.len());
        self
    }

    fn finish(self) -> SqlStatement {
        SqlStatement {
            text: self.text,
            binds: self.binds,
        }
    }
}

/// Every column of `E`, comma separated, in storage order.
pub(crate) fn column_list<E: Entity>() -> String {
    E::Field::ALL
        .iter()
        .map(|field| field.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_clause<F: EntityField>(builder: &mut Builder, clause: &Clause<F>) {
    let column = clause.field.name();
    let kind = clause.field.kind();
    builder.push(column);
    match &clause.op {
        Op::Equals(FieldValue::Null) => {
            builder.push(" IS NULL");
        }
        Op::Equals(value) => {
            builder.push(" = ").bind(kind, value.clone());
        }
        Op::Between(min, max) => {
            builder
                .push(" BETWEEN ")
                .bind(kind, min.clone())
                .push(" AND ")
                .bind(kind, max.clone());
        }
        Op::GreaterThan(value) => {
            builder.push(" > ").bind(kind, value.clone());
        }
        Op::LessThan(value) => {
            builder.push(" < ").bind(kind, value.clone());
        }
        Op::ILike(pattern) => {
            builder
                .push(" ILIKE ")
                .bind(FieldKind::Text, FieldValue::Text(pattern.clone()))
                .push(" ESCAPE ''");
        }
    }
}

fn push_where<F: EntityField>(builder: &mut Builder, predicate: &Predicate<F>) {
    if predicate.all.is_empty() && predicate.any.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut first = true;
    for clause in &predicate.all {
        if !first {
            builder.push(" AND ");
        }
        first = false;
        push_clause(builder, clause);
    }
    if predicate.any.is_empty() {
        return;
    }
    if !first {
        builder.push(" AND ");
    }
    builder.push("(");
    for (index, clause) in predicate.any.iter().enumerate() {
        if index > 0 {
            builder.push(" OR ");
        }
        push_clause(builder, clause);
    }
    builder.push(")");
}

fn push_id_list<E: Entity>(builder: &mut Builder, ids: &[EntityId]) {
    if ids.is_empty() {
        builder.push(" WHERE FALSE");
        return;
    }
    builder.push(" WHERE ").push(E::ID.name()).push(" IN (");
    for (index, id) in ids.iter().enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        builder.bind(FieldKind::Integer, FieldValue::from(*id));
    }
    builder.push(")");
}

/// One ordered window of full rows matching `plan`.
pub(crate) fn select<E: Entity>(plan: &QueryPlan<E::Field>) -> SqlStatement {
    let mut builder = Builder::default();
    builder
        .push("SELECT ")
        .push(&column_list::<E>())
        .push(" FROM ")
        .push(E::TABLE);
    push_where(&mut builder, &plan.predicate);
    if !plan.order.is_empty() {
        let order = plan
            .order
            .iter()
            .map(|(field, direction)| format!("{} {}", field.name(), direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        builder.push(" ORDER BY ").push(&order);
    }
    let offset = i64::try_from(plan.page.offset()).unwrap_or(i64::MAX);
    builder
        .push(" LIMIT ")
        .bind(FieldKind::Integer, FieldValue::Integer(i64::from(plan.page.limit())))
        .push(" OFFSET ")
        .bind(FieldKind::Integer, FieldValue::Integer(offset));
    builder.finish()
}

/// Number of rows matching `predicate`, aliased as `count`.
pub(crate) fn count<E: Entity>(predicate: &Predicate<E::Field>) -> SqlStatement {
    let mut builder = Builder::default();
    builder.push("SELECT COUNT(*) AS count FROM ").push(E::TABLE);
    push_where(&mut builder, predicate);
    builder.finish()
}

/// Full rows for `ids`, ordered by identifier. `lock` appends `FOR UPDATE`.
pub(crate) fn find_by_ids<E: Entity>(ids: &[EntityId], lock: bool) -> SqlStatement {
    let mut builder = Builder::default();
    builder
        .push("SELECT ")
        .push(&column_list::<E>())
        .push(" FROM ")
        .push(E::TABLE);
    push_id_list::<E>(&mut builder, ids);
    builder.push(" ORDER BY ").push(E::ID.name()).push(" ASC");
    if lock {
        builder.push(" FOR UPDATE");
    }
    builder.finish()
}

/// Multi-row insert returning the stored rows. Columns are taken from the
/// first row; every row must list the same columns in the same order.
pub(crate) fn insert<E: Entity>(rows: &[Vec<(E::Field, FieldValue)>]) -> Option<SqlStatement> {
    let first = rows.first()?;
    let columns = first
        .iter()
        .map(|(field, _)| field.name())
        .collect::<Vec<_>>()
        .join(", ");

    let mut builder = Builder::default();
    builder
        .push("INSERT INTO ")
        .push(E::TABLE)
        .push(" (")
        .push(&columns)
        .push(") VALUES ");
    for (row_index, row) in rows.iter().enumerate() {
        if row_index > 0 {
            builder.push(", ");
        }
        builder.push("(");
        for (index, (field, value)) in row.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.bind(field.kind(), value.clone());
        }
        builder.push(")");
    }
    builder.push(" RETURNING ").push(&column_list::<E>());
    Some(builder.finish())
}

/// Write every mutable column of `entity` back to its row.
pub(crate) fn update<E: Entity>(entity: &E) -> SqlStatement {
    let mut builder = Builder::default();
    builder.push("UPDATE ").push(E::TABLE).push(" SET ");
    let mutable = E::Field::ALL
        .iter()
        .copied()
        .filter(|field| *field != E::ID && *field != E::CREATED_AT);
    for (index, field) in mutable.enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        builder
            .push(field.name())
            .push(" = ")
            .bind(field.kind(), entity.value(field));
    }
    builder
        .push(" WHERE ")
        .push(E::ID.name())
        .push(" = ")
        .bind(FieldKind::Integer, FieldValue::from(entity.id()))
        .push(" RETURNING ")
        .push(&column_list::<E>());
    builder.finish()
}

/// Physical removal of `ids`.
pub(crate) fn delete<E: Entity>(ids: &[EntityId]) -> SqlStatement {
    let mut builder = Builder::default();
    builder.push("DELETE FROM ").push(E::TABLE);
    push_id_list::<E>(&mut builder, ids);
    builder.finish()
}
