//! TSPLIB text for LKH: explicit-matrix problems out, tours back in.

use std::{
    fmt::{self, Display, Formatter},
    ops::{Deref, DerefMut},
};

use crate::{Error, Result};

const TOUR_SECTION_HEADER: &str = "TOUR_SECTION";
const TOUR_END_MARKER: &str = "-1";
const EOF_MARKER: &str = "EOF";
const TSPLIB_NODE_ID_OFFSET: usize = 1;

/// Line-oriented writer shared by problem and parameter files.
pub(crate) struct SpecWriter<'a, 'b>(&'a mut Formatter<'b>);

impl<'b> Deref for SpecWriter<'_, 'b> {
    type Target = Formatter<'b>;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl DerefMut for SpecWriter<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0
    }
}

impl<'a, 'b> SpecWriter<'a, 'b> {
    pub(crate) fn new(f: &'a mut Formatter<'b>) -> Self {
        Self(f)
    }

    pub(crate) fn line<T: Display>(&mut self, value: T) -> fmt::Result {
        writeln!(self, "{value}")
    }

    pub(crate) fn kv_eq<T: Display>(&mut self, key: &str, value: T) -> fmt::Result {
        writeln!(self, "{key} = {value}")
    }

    pub(crate) fn kv_colon<T: Display>(&mut self, key: &str, value: T) -> fmt::Result {
        writeln!(self, "{key}: {value}")
    }

    pub(crate) fn row<T: Display>(&mut self, row: &[T]) -> fmt::Result {
        let Some((first, rest)) = row.split_first() else {
            return Ok(());
        };
        write!(self, "{first}")?;
        for value in rest {
            write!(self, " {value}")?;
        }
        self.line("")
    }
}

/// Asymmetric problem over a full row-major weight matrix. Every edge into
/// `open_at` costs nothing, so the cheapest closed tour is the cheapest open
/// path leaving `open_at`.
#[derive(Clone, Debug)]
pub(crate) struct OpenPathProblem<'a> {
    name: &'a str,
    dimension: usize,
    weights: &'a [i64],
    open_at: usize,
}

impl<'a> OpenPathProblem<'a> {
    pub(crate) fn new(
        name: &'a str,
        weights: &'a [i64],
        dimension: usize,
        open_at: usize,
    ) -> Result<Self> {
        if weights.len() != dimension * dimension {
            return Err(Error::invalid_input(format!(
                "matrix has {} cells, expected {dimension}x{dimension}",
                weights.len()
            )));
        }
        if open_at >= dimension {
            return Err(Error::invalid_input(format!(
                "start {open_at} is outside a {dimension} node problem"
            )));
        }
        Ok(Self {
            name,
            dimension,
            weights,
            open_at,
        })
    }
}

impl Display for OpenPathProblem<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut writer = SpecWriter::new(f);

        writer.kv_colon("NAME", self.name)?;
        writer.kv_colon("TYPE", "ATSP")?;
        writer.kv_colon("DIMENSION", self.dimension)?;
        writer.kv_colon("EDGE_WEIGHT_TYPE", "EXPLICIT")?;
        writer.kv_colon("EDGE_WEIGHT_FORMAT", "FULL_MATRIX")?;
        writer.line("EDGE_WEIGHT_SECTION")?;

        let mut row = Vec::with_capacity(self.dimension);
        for cells in self.weights.chunks(self.dimension) {
            row.clear();
            row.extend(
                cells
                    .iter()
                    .enumerate()
                    .map(|(to, &weight)| if to == self.open_at { 0 } else { weight }),
            );
            writer.row(&row)?;
        }

        writer.line(EOF_MARKER)
    }
}

/// Zero-based node order from the `TOUR_SECTION` of an LKH tour file.
///
/// Headers are ignored. Non-positive ids other than the `-1` terminator are
/// skipped.
pub(crate) fn parse_tour(text: &str) -> Result<Vec<usize>> {
    let mut in_tour_section = false;
    let mut tour = Vec::new();

    'lines: for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case(EOF_MARKER) {
            break;
        }
        if !in_tour_section {
            in_tour_section = line.eq_ignore_ascii_case(TOUR_SECTION_HEADER);
            continue;
        }

        for token in line.split_whitespace() {
            if token == TOUR_END_MARKER || token.eq_ignore_ascii_case(EOF_MARKER) {
                break 'lines;
            }
            let id: isize = token
                .parse()
                .map_err(|e| Error::invalid_data(format!("Bad tour token '{token}': {e}")))?;
            if id < TSPLIB_NODE_ID_OFFSET as isize {
                continue;
            }
            tour.push(id as usize - TSPLIB_NODE_ID_OFFSET);
        }
    }

    if !in_tour_section {
        return Err(Error::invalid_data("Missing TOUR_SECTION"));
    }
    Ok(tour)
}
