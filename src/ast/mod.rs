//! Term/AST Builder (spec.md §4.8): a minimal fluent query-tree builder,
//! just enough to construct [`Term`] values the Wire Codec can serialize and
//! the Connection Facade can submit. Query-language semantics beyond this
//! minimal term set are out of scope.
//!
//! Grounded on the teacher's `ClientBuilder` (`client/builder.rs`) as "the
//! single entry point a caller reaches for first" — here that role belongs
//! to the `r` module rather than a struct, since term construction is a
//! tree of pure values, not a stateful builder.

use crate::proto::{Datum, Term, TermType};
use std::collections::BTreeMap;

/// The crate's query-tree entry point. `r::expr` and `r::table` are where
/// every term tree starts.
pub mod r {
    use super::*;

    /// Wraps a literal value as a `DATUM` term.
    pub fn expr(value: impl Into<Datum>) -> Term {
        Term::datum(value)
    }

    /// A table-selection term, the usual root of a document query.
    pub fn table(name: impl Into<String>) -> Term {
        Term::op(TermType::Table, vec![Term::datum(name.into())])
    }

    /// The database-list introspection term.
    pub fn db_list() -> Term {
        Term::op(TermType::DbList, Vec::new())
    }

    /// The table-list introspection term.
    pub fn table_list() -> Term {
        Term::op(TermType::TableList, Vec::new())
    }
}

/// Chainable builder methods, implemented as an extension trait over the
/// wire-level [`Term`] so `docql::ast` owns query-tree construction while
/// `docql::proto::term` owns only serialization.
pub trait TermExt: Sized {
    /// Point lookup by primary key, chainable off a table term.
    fn get(self, key: impl Into<Datum>) -> Term;

    /// Multi-key lookup.
    fn get_all(self, keys: impl IntoIterator<Item = impl Into<Datum>>) -> Term;

    /// Restricts a sequence term to rows matching `predicate` (itself a
    /// term — predicates are data, not closures, so the whole tree
    /// serializes over the wire).
    fn filter(self, predicate: Term) -> Term;

    /// Inserts `documents` into a table term.
    fn insert(self, documents: impl Into<Datum>) -> Term;

    /// Applies `patch` to every row selected by this term.
    fn update(self, patch: impl Into<Datum>) -> Term;

    /// Deletes every row selected by this term.
    fn delete(self) -> Term;

    /// Truncates a sequence term to at most `n` results.
    fn limit(self, n: u64) -> Term;

    /// Multi-key lookup against a secondary index rather than the primary
    /// key, carried as the `index` keyword argument on the GET_ALL term.
    fn get_all_with_index(
        self,
        keys: impl IntoIterator<Item = impl Into<Datum>>,
        index: impl Into<String>,
    ) -> Term;
}

impl TermExt for Term {
    fn get(self, key: impl Into<Datum>) -> Term {
        Term::op(TermType::Get, vec![self, Term::datum(key.into())])
    }

    fn get_all(self, keys: impl IntoIterator<Item = impl Into<Datum>>) -> Term {
        let mut args = vec![self];
        args.extend(keys.into_iter().map(|key| Term::datum(key.into())));
        Term::op(TermType::GetAll, args)
    }

    fn filter(self, predicate: Term) -> Term {
        Term::op(TermType::Filter, vec![self, predicate])
    }

    fn insert(self, documents: impl Into<Datum>) -> Term {
        Term::op(TermType::Insert, vec![self, Term::datum(documents.into())])
    }

    fn update(self, patch: impl Into<Datum>) -> Term {
        Term::op(TermType::Update, vec![self, Term::datum(patch.into())])
    }

    fn delete(self) -> Term {
        Term::op(TermType::Delete, vec![self])
    }

    fn limit(self, n: u64) -> Term {
        Term::op(TermType::Limit, vec![self, Term::datum(n as f64)])
    }

    fn get_all_with_index(
        self,
        keys: impl IntoIterator<Item = impl Into<Datum>>,
        index: impl Into<String>,
    ) -> Term {
        let mut args = vec![self];
        args.extend(keys.into_iter().map(|key| Term::datum(key.into())));
        Term::op_with_optargs(
            TermType::GetAll,
            args,
            optargs([("index", Term::datum(index.into()))]),
        )
    }
}

/// Builds a keyword-argument map for [`Term::op_with_optargs`] from
/// `(name, value)` pairs — a small helper since `BTreeMap::from` reads
/// awkwardly at call sites that mix literal and term values.
pub fn optargs(pairs: impl IntoIterator<Item = (&'static str, Term)>) -> BTreeMap<String, Term> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_get_builds_expected_tree() {
        let term = r::table("users").get("u1");
        assert_eq!(term.term_type(), TermType::Get);
    }

    #[test]
    fn filter_wraps_predicate_as_second_arg() {
        let predicate = r::expr(true);
        let term = r::table("users").filter(predicate);
        assert_eq!(term.term_type(), TermType::Filter);
    }

    #[test]
    fn limit_wraps_count_as_datum_term() {
        let term = r::table("users").limit(10);
        assert_eq!(term.term_type(), TermType::Limit);
    }

    #[test]
    fn expr_of_literal_is_a_datum_term() {
        let term = r::expr(42.0);
        assert_eq!(term.term_type(), TermType::DatumTerm);
        assert_eq!(term.as_datum(), Some(&Datum::Num(42.0)));
    }

    #[test]
    fn get_all_with_index_attaches_index_optarg() {
        let term = r::table("users").get_all_with_index(vec!["a", "b"], "email");
        assert_eq!(term.term_type(), TermType::GetAll);
        assert_eq!(term.optargs().get("index").and_then(Term::as_datum), Some(&Datum::Str("email".to_string())));
    }
}
