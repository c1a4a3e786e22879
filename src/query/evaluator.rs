//! Postfix evaluation over the read-only index
//!
//! Operands stay as unresolved term references until an operator needs
//! their documents. A `NOT` directly followed by `AND` is evaluated as a
//! single difference pass (`a AND NOT b` is `a \ b`) instead of building
//! the complement of `b` against the whole universe.

use std::time::{Duration, Instant};

use super::parser::QueryToken;
use crate::error::BlockdexError;
use crate::index::{complement, difference, intersect, merge_postings, PostingList};
use crate::search::SearchIndex;
use crate::Result;

/// Evaluation operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A term whose postings have not been loaded yet
    TermRef(String),
    /// Materialized, sorted document ids
    List(PostingList),
}

/// Per-query evaluation state
pub struct QueryContext<'a> {
    index: &'a SearchIndex,
    /// 1-based line number of the query, for error reporting
    line: usize,
    deadline: Option<Instant>,
}

impl<'a> QueryContext<'a> {
    pub fn new(index: &'a SearchIndex, line: usize) -> Self {
        Self {
            index,
            line,
            deadline: None,
        }
    }

    /// Fail the query once `budget` has elapsed from now
    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    /// Evaluate a postfix token sequence to its result list
    pub fn evaluate(&self, tokens: &[QueryToken]) -> Result<PostingList> {
        let mut stack: Vec<Operand> = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            self.check_deadline()?;

            match &tokens[i] {
                QueryToken::Term(term) => stack.push(Operand::TermRef(term.clone())),
                QueryToken::Or => {
                    let (a, b) = self.pop_pair(&mut stack, "OR")?;
                    stack.push(Operand::List(merge_postings(&a, &b)));
                }
                QueryToken::And => {
                    let (a, b) = self.pop_pair(&mut stack, "AND")?;
                    stack.push(Operand::List(intersect(&a, &b)));
                }
                QueryToken::Not => {
                    if tokens.get(i + 1) == Some(&QueryToken::And) && stack.len() >= 2 {
                        let (a, b) = self.pop_pair(&mut stack, "AND")?;
                        stack.push(Operand::List(difference(&a, &b)));
                        i += 1;
                    } else {
                        let a = self.pop_one(&mut stack, "NOT")?;
                        stack.push(Operand::List(complement(self.index.universe(), &a)));
                    }
                }
            }

            i += 1;
        }

        match stack.len() {
            1 => match stack.pop() {
                Some(operand) => self.resolve(operand),
                None => Err(self.error("empty operand stack")),
            },
            0 => Err(self.error("query has no operands")),
            n => Err(self.error(&format!(
                "{} operands left after evaluation; missing operator",
                n
            ))),
        }
    }

    /// Load an operand's documents; unknown terms match nothing
    pub fn resolve(&self, operand: Operand) -> Result<PostingList> {
        match operand {
            Operand::List(list) => Ok(list),
            Operand::TermRef(term) => self.index.postings(&term),
        }
    }

    fn pop_one(&self, stack: &mut Vec<Operand>, op: &str) -> Result<PostingList> {
        let operand = stack
            .pop()
            .ok_or_else(|| self.error(&format!("{} has no operand", op)))?;
        self.resolve(operand)
    }

    /// Pop two operands, returned in (left, right) order
    fn pop_pair(&self, stack: &mut Vec<Operand>, op: &str) -> Result<(PostingList, PostingList)> {
        if stack.len() < 2 {
            return Err(self.error(&format!("{} needs two operands", op)));
        }
        let right = self.pop_one(stack, op)?;
        let left = self.pop_one(stack, op)?;
        Ok((left, right))
    }

    fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(BlockdexError::DeadlineExceeded { line: self.line })
            }
            _ => Ok(()),
        }
    }

    fn error(&self, message: &str) -> BlockdexError {
        BlockdexError::Query {
            line: self.line,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PartialIndex;
    use proptest::prelude::*;

    fn term(t: &str) -> QueryToken {
        QueryToken::Term(t.to_string())
    }

    /// {1: "cats dogs", 2: "cats", 3: "dogs birds"}
    fn sample_index() -> SearchIndex {
        SearchIndex::from_partial(&PartialIndex::from_sorted(vec![
            ("bird".to_string(), vec![3]),
            ("cat".to_string(), vec![1, 2]),
            ("dog".to_string(), vec![1, 3]),
        ]))
        .unwrap()
    }

    fn eval(index: &SearchIndex, tokens: &[QueryToken]) -> Result<PostingList> {
        QueryContext::new(index, 1).evaluate(tokens)
    }

    #[test]
    fn test_single_term() {
        let index = sample_index();
        assert_eq!(eval(&index, &[term("cat")]).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_missing_term_is_empty() {
        let index = sample_index();
        assert!(eval(&index, &[term("cow")]).unwrap().is_empty());
        assert_eq!(
            eval(&index, &[term("cow"), term("cat"), QueryToken::Or]).unwrap(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_and_or_not() {
        let index = sample_index();
        assert_eq!(
            eval(&index, &[term("cat"), term("dog"), QueryToken::And]).unwrap(),
            vec![1]
        );
        assert_eq!(
            eval(&index, &[term("cat"), term("bird"), QueryToken::Or]).unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(eval(&index, &[term("cat"), QueryToken::Not]).unwrap(), vec![3]);
    }

    #[test]
    fn test_fused_and_not() {
        let index = sample_index();
        let fused = eval(&index, &[term("dog"), term("cat"), QueryToken::Not, QueryToken::And]);
        assert_eq!(fused.unwrap(), vec![3]);
    }

    #[test]
    fn test_not_then_and_with_one_operand_is_not_fused() {
        let index = sample_index();
        // NOT cat AND dog -> cat NOT dog AND
        let tokens = [term("cat"), QueryToken::Not, term("dog"), QueryToken::And];
        assert_eq!(eval(&index, &tokens).unwrap(), vec![3]);
    }

    #[test]
    fn test_or_with_complement_is_universe() {
        let index = sample_index();
        let tokens = [term("cat"), term("cat"), QueryToken::Not, QueryToken::Or];
        assert_eq!(eval(&index, &tokens).unwrap(), vec![1, 2, 3]);

        let tokens = [term("cat"), term("cat"), QueryToken::Or];
        assert_eq!(eval(&index, &tokens).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_malformed_postfix() {
        let index = sample_index();

        let err = QueryContext::new(&index, 4).evaluate(&[]).unwrap_err();
        assert!(matches!(err, BlockdexError::Query { line: 4, .. }));

        let err = eval(&index, &[term("cat"), term("dog")]).unwrap_err();
        assert!(matches!(err, BlockdexError::Query { .. }));

        let err = eval(&index, &[term("cat"), QueryToken::And]).unwrap_err();
        assert!(matches!(err, BlockdexError::Query { .. }));

        let err = eval(&index, &[QueryToken::Not]).unwrap_err();
        assert!(matches!(err, BlockdexError::Query { .. }));
    }

    #[test]
    fn test_deadline_exceeded() {
        let index = sample_index();
        let err = QueryContext::new(&index, 9)
            .with_deadline(Duration::ZERO)
            .evaluate(&[term("cat")])
            .unwrap_err();
        assert!(matches!(err, BlockdexError::DeadlineExceeded { line: 9 }));

        let ok = QueryContext::new(&index, 9)
            .with_deadline(Duration::from_secs(60))
            .evaluate(&[term("cat")]);
        assert_eq!(ok.unwrap(), vec![1, 2]);
    }

    fn arb_index() -> impl Strategy<Value = PartialIndex> {
        prop::collection::btree_map(
            "[a-d]",
            prop::collection::btree_set(1u32..30, 1..10),
            1..5,
        )
        .prop_map(|m| {
            PartialIndex::from_sorted(
                m.into_iter()
                    .map(|(t, s)| (t, s.into_iter().collect()))
                    .collect(),
            )
        })
    }

    proptest! {
        #[test]
        fn fused_and_not_matches_expanded_form(
            partial in arb_index(),
            a in "[a-e]",
            b in "[a-e]",
        ) {
            let index = SearchIndex::from_partial(&partial).unwrap();
            let ctx = QueryContext::new(&index, 1);

            let fused = ctx
                .evaluate(&[term(&a), term(&b), QueryToken::Not, QueryToken::And])
                .unwrap();

            // Same expression with the complement materialized first
            let not_b = ctx.evaluate(&[term(&b), QueryToken::Not]).unwrap();
            let expanded = intersect(&ctx.resolve(Operand::TermRef(a.clone())).unwrap(), &not_b);

            prop_assert_eq!(fused, expanded);
        }

        #[test]
        fn and_is_commutative(partial in arb_index(), a in "[a-d]", b in "[a-d]") {
            let index = SearchIndex::from_partial(&partial).unwrap();
            let ctx = QueryContext::new(&index, 1);

            let ab = ctx.evaluate(&[term(&a), term(&b), QueryToken::And]).unwrap();
            let ba = ctx.evaluate(&[term(&b), term(&a), QueryToken::And]).unwrap();
            let la = ctx.resolve(Operand::TermRef(a.clone())).unwrap();
            let lb = ctx.resolve(Operand::TermRef(b.clone())).unwrap();

            prop_assert!(ab.iter().all(|id| la.contains(id) && lb.contains(id)));
            prop_assert_eq!(ab, ba);
        }
    }
}
