// Row List Implementation
//
// A row list pairs a set of variables with a single-pass producer of rows.
// Joins consume their inputs as row lists and hand their output back as one.

use log::debug;

use crate::executor::operators::Operator;
use crate::executor::result::{JoinError, JoinResult};
use crate::executor::row::{Row, Value, Var};

/// Rows held in memory
pub struct VecSource<X> {
    rows: std::vec::IntoIter<Row<X>>,
}

impl<X: Value> VecSource<X> {
    pub fn new(rows: Vec<Row<X>>) -> Self {
        VecSource { rows: rows.into_iter() }
    }
}

impl<X: Value> Operator<X> for VecSource<X> {
    fn next(&mut self) -> JoinResult<Option<Row<X>>> {
        Ok(self.rows.next())
    }

    fn close(&mut self) -> JoinResult<()> {
        // Drop whatever was not consumed
        self.rows = Vec::new().into_iter();
        Ok(())
    }
}

/// Rows produced by a fallible iterator
pub struct IterSource<I> {
    iter: Option<I>,
}

impl<I> IterSource<I> {
    pub fn new(iter: I) -> Self {
        IterSource { iter: Some(iter) }
    }
}

impl<X, I> Operator<X> for IterSource<I>
where
    X: Value,
    I: Iterator<Item = JoinResult<Row<X>>> + Send,
{
    fn next(&mut self) -> JoinResult<Option<Row<X>>> {
        match self.iter.as_mut() {
            Some(iter) => iter.next().transpose(),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> JoinResult<()> {
        self.iter = None;
        Ok(())
    }
}

/// Ordered, deduplicated variables plus a lazy, single-pass row producer
pub struct RowList<X> {
    vars: Vec<Var>,
    source: Box<dyn Operator<X>>,
    closed: bool,
}

impl<X: Value> RowList<X> {
    /// Wrap an operator producing rows over `vars`
    pub fn from_operator<V>(vars: V, source: Box<dyn Operator<X>>) -> Self
    where
        V: IntoIterator,
        V::Item: Into<Var>,
    {
        RowList { vars: dedup_vars(vars), source, closed: false }
    }

    /// Materialized rows over an explicit variable set
    pub fn with_vars<V>(vars: V, rows: Vec<Row<X>>) -> Self
    where
        V: IntoIterator,
        V::Item: Into<Var>,
    {
        Self::from_operator(vars, Box::new(VecSource::new(rows)))
    }

    /// Materialized rows; the variable set is every variable any row binds
    pub fn from_rows(rows: Vec<Row<X>>) -> Self {
        let vars: Vec<Var> = rows.iter().flat_map(|row| row.vars().cloned()).collect();
        Self::with_vars(vars, rows)
    }

    /// Rows pulled lazily from a fallible iterator
    pub fn from_results<V, I>(vars: V, iter: I) -> Self
    where
        V: IntoIterator,
        V::Item: Into<Var>,
        I: Iterator<Item = JoinResult<Row<X>>> + Send + 'static,
    {
        Self::from_operator(vars, Box::new(IterSource::new(iter)))
    }

    pub fn empty<V>(vars: V) -> Self
    where
        V: IntoIterator,
        V::Item: Into<Var>,
    {
        Self::with_vars(vars, Vec::new())
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drain every remaining row, then close
    pub fn materialize(mut self) -> JoinResult<Vec<Row<X>>> {
        let mut rows = Vec::new();
        let drained = loop {
            match self.next() {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        let closed = self.close();
        drained?;
        closed?;
        Ok(rows)
    }
}

impl<X: Value> Operator<X> for RowList<X> {
    fn init(&mut self) -> JoinResult<()> {
        if self.closed {
            return Err(JoinError::IllegalState("row list already closed".to_string()));
        }
        self.source.init()
    }

    fn next(&mut self) -> JoinResult<Option<Row<X>>> {
        if self.closed {
            return Err(JoinError::IllegalState("row list already closed".to_string()));
        }
        self.source.next()
    }

    fn close(&mut self) -> JoinResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("Closing row list over {} vars", self.vars.len());
        self.source.close()
    }
}

/// Order-preserving deduplication of variables
pub(crate) fn dedup_vars<V>(vars: V) -> Vec<Var>
where
    V: IntoIterator,
    V::Item: Into<Var>,
{
    let mut out: Vec<Var> = Vec::new();
    for var in vars {
        let var = var.into();
        if !out.contains(&var) {
            out.push(var);
        }
    }
    out
}
