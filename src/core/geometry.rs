//! Layer 3: Geometry helpers
//!
//! WKT LINESTRING parsing/serialization, planar length, endpoint
//! extraction, and the whole-road union used as the default geometry for
//! whole-road additional street data records.
//!
//! All coordinates are planar (projected grid). Lengths are reported in
//! whole metres.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::error::GeometryError;

/// Default endpoint-join tolerance for the whole-road union, in grid units.
pub const JOIN_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    fn close_to(&self, other: &Point, epsilon: f64) -> bool {
        self.distance(other) <= epsilon
    }
}

/// First and last vertex of a line, in wire field names.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

/// A parsed LINESTRING with at least two finite vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct LineString(Vec<Point>);

impl LineString {
    pub fn new(points: Vec<Point>) -> Result<Self, GeometryError> {
        if points.len() < 2 {
            return Err(GeometryError {
                raw: String::new(),
                reason: format!("line needs at least 2 points (got {})", points.len()),
            });
        }
        for p in &points {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(GeometryError {
                    raw: String::new(),
                    reason: "non-finite coordinate".into(),
                });
            }
        }
        Ok(Self(points))
    }

    /// Parse WKT `LINESTRING (x y, x y, ...)` text.
    ///
    /// The keyword is case-insensitive and whitespace before the
    /// parenthesis is optional. Anything else (including MULTILINESTRING)
    /// is rejected.
    pub fn parse(raw: &str) -> Result<Self, GeometryError> {
        let fail = |reason: &str| GeometryError {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        let keyword = "LINESTRING";
        if trimmed.len() < keyword.len() || !trimmed[..keyword.len()].eq_ignore_ascii_case(keyword)
        {
            return Err(fail("expected LINESTRING keyword"));
        }
        let rest = trimmed[keyword.len()..].trim_start();
        let inner = rest
            .strip_prefix('(')
            .ok_or_else(|| fail("expected opening paren"))?
            .strip_suffix(')')
            .ok_or_else(|| fail("expected closing paren"))?;

        let mut points = Vec::new();
        for pair in inner.split(',') {
            let mut coords = pair.split_whitespace();
            let x = coords
                .next()
                .ok_or_else(|| fail("empty coordinate pair"))?
                .parse::<f64>()
                .map_err(|_| fail("unparsable x coordinate"))?;
            let y = coords
                .next()
                .ok_or_else(|| fail("coordinate pair missing y"))?
                .parse::<f64>()
                .map_err(|_| fail("unparsable y coordinate"))?;
            if coords.next().is_some() {
                return Err(fail("coordinate pair has more than two values"));
            }
            points.push(Point { x, y });
        }

        Self::new(points).map_err(|e| fail(&e.reason))
    }

    pub fn to_wkt(&self) -> String {
        let mut out = String::from("LINESTRING (");
        write_points(&mut out, &self.0);
        out.push(')');
        out
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn start(&self) -> Point {
        self.0[0]
    }

    pub fn end(&self) -> Point {
        self.0[self.0.len() - 1]
    }

    /// Planar length: sum of segment lengths.
    pub fn length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }

    pub fn reversed(&self) -> LineString {
        let mut points = self.0.clone();
        points.reverse();
        LineString(points)
    }

    pub fn endpoints(&self) -> Endpoints {
        let start = self.start();
        let end = self.end();
        Endpoints {
            start_x: start.x,
            start_y: start.y,
            end_x: end.x,
            end_y: end.y,
        }
    }
}

fn write_points(out: &mut String, points: &[Point]) {
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{} {}", p.x, p.y);
    }
}

/// First and last vertex of a line geometry, or `None` when the text is
/// empty or not a parsable LINESTRING.
pub fn endpoints(raw: &str) -> Option<Endpoints> {
    LineString::parse(raw).ok().map(|line| line.endpoints())
}

/// Union of several line geometries into one whole-road geometry.
///
/// Lines whose endpoints coincide within `epsilon` are chained end to
/// start (reversing where needed); disjoint chains are emitted as a
/// MULTILINESTRING. Empty inputs are skipped; no parsable input at all
/// yields the empty string.
pub fn union_whole_road<'a, I>(wkts: I, epsilon: f64) -> Result<String, GeometryError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut lines = Vec::new();
    for raw in wkts {
        if raw.trim().is_empty() {
            continue;
        }
        lines.push(LineString::parse(raw)?);
    }
    if lines.is_empty() {
        return Ok(String::new());
    }

    let chains = chain_lines(lines, epsilon);
    if chains.len() == 1 {
        return Ok(chains[0].to_wkt());
    }

    let mut out = String::from("MULTILINESTRING (");
    for (i, chain) in chains.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('(');
        write_points(&mut out, chain.points());
        out.push(')');
    }
    out.push(')');
    Ok(out)
}

/// Greedy endpoint chaining. Input order decides which chain a shared
/// junction joins, keeping the output stable for a given ESU ordering.
fn chain_lines(mut lines: Vec<LineString>, epsilon: f64) -> Vec<LineString> {
    let mut chains: Vec<LineString> = Vec::new();

    while !lines.is_empty() {
        let mut chain = lines.remove(0).0;
        loop {
            let mut extended = false;
            let mut i = 0;
            while i < lines.len() {
                let head = chain[0];
                let tail = chain[chain.len() - 1];
                let cand = &lines[i];

                if tail.close_to(&cand.start(), epsilon) {
                    let cand = lines.remove(i);
                    chain.extend_from_slice(&cand.0[1..]);
                } else if tail.close_to(&cand.end(), epsilon) {
                    let cand = lines.remove(i).reversed();
                    chain.extend_from_slice(&cand.0[1..]);
                } else if head.close_to(&cand.end(), epsilon) {
                    let cand = lines.remove(i);
                    let mut joined = cand.0;
                    joined.extend_from_slice(&chain[1..]);
                    chain = joined;
                } else if head.close_to(&cand.start(), epsilon) {
                    let cand = lines.remove(i).reversed();
                    let mut joined = cand.0;
                    joined.extend_from_slice(&chain[1..]);
                    chain = joined;
                } else {
                    i += 1;
                    continue;
                }
                extended = true;
            }
            if !extended {
                break;
            }
        }
        chains.push(LineString(chain));
    }

    chains
}

/// Total planar length over several line geometries, rounded to whole
/// metres. Empty inputs are skipped.
pub fn total_length<'a, I>(wkts: I) -> Result<u32, GeometryError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut total = 0.0;
    for raw in wkts {
        if raw.trim().is_empty() {
            continue;
        }
        total += LineString::parse(raw)?.length();
    }
    Ok(total.round() as u32)
}
