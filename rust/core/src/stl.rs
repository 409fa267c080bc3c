// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Restricted ASCII STL reader and writer
//!
//! The accepted grammar is the classic text STL layout:
//!
//! ```text
//! solid <name>
//!   facet normal <fx> <fy> <fz>
//!     outer loop
//!       vertex <x> <y> <z>
//!       vertex <x> <y> <z>
//!       vertex <x> <y> <z>
//!     endloop
//!   endfacet
//!   ...
//! endsolid <name>
//! ```
//!
//! Keyword matching is strict and malformed input is fatal; the reader has
//! no recovery. The facet normal is parsed but vertex winding stays the
//! authoritative orientation, and the writer re-derives every normal from
//! winding.

use crate::error::{Error, Result};
use std::io::Write as _;
use std::path::Path;

/// One triangle of the wire format: a parsed normal plus three vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facet {
    pub normal: [f32; 3],
    pub vertices: [[f32; 3]; 3],
}

impl Facet {
    /// Build a facet from vertices alone, deriving the normal from winding.
    pub fn from_vertices(vertices: [[f32; 3]; 3]) -> Self {
        Self {
            normal: winding_normal(&vertices),
            vertices,
        }
    }
}

/// A named solid parsed from an STL stream
#[derive(Debug, Clone, Default)]
pub struct StlSolid {
    pub name: String,
    pub facets: Vec<Facet>,
}

/// `normalize((b - a) x (c - a))`, or zero for degenerate facets
pub fn winding_normal(vertices: &[[f32; 3]; 3]) -> [f32; 3] {
    let [a, b, c] = vertices;
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 0.0, 0.0]
    }
}

struct Tokens<'a> {
    inner: std::str::SplitAsciiWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: input.split_ascii_whitespace(),
        }
    }

    fn next(&mut self, what: &'static str) -> Result<&'a str> {
        self.inner.next().ok_or(Error::UnexpectedEof(what))
    }

    fn expect(&mut self, keyword: &'static str) -> Result<()> {
        let token = self.next(keyword)?;
        if token != keyword {
            return Err(Error::UnexpectedToken {
                expected: keyword,
                found: token.to_string(),
            });
        }
        Ok(())
    }

    fn float(&mut self) -> Result<f32> {
        let token = self.next("a number")?;
        fast_float::parse(token).map_err(|_| Error::MalformedNumber(token.to_string()))
    }

    fn vec3(&mut self) -> Result<[f32; 3]> {
        Ok([self.float()?, self.float()?, self.float()?])
    }
}

/// Parse a solid from ASCII STL text.
///
/// The first bad token aborts the read with an error naming what was
/// expected; nothing partial is returned.
pub fn read(input: &str) -> Result<StlSolid> {
    let mut tokens = Tokens::new(input);

    tokens.expect("solid")?;
    let name = tokens.next("solid name")?.to_string();

    let mut facets = Vec::new();
    loop {
        let token = tokens.next("'facet' or 'endsolid'")?;
        if token == "endsolid" {
            break;
        } else if token != "facet" {
            return Err(Error::UnexpectedToken {
                expected: "'facet' or 'endsolid'",
                found: token.to_string(),
            });
        }

        tokens.expect("normal")?;
        let normal = tokens.vec3()?;

        tokens.expect("outer")?;
        tokens.expect("loop")?;

        let mut vertices = [[0.0f32; 3]; 3];
        for vertex in &mut vertices {
            tokens.expect("vertex")?;
            *vertex = tokens.vec3()?;
        }

        tokens.expect("endloop")?;
        tokens.expect("endfacet")?;

        facets.push(Facet { normal, vertices });
    }

    Ok(StlSolid { name, facets })
}

/// Serialize facets as ASCII STL, re-deriving each normal from winding.
pub fn write(name: &str, facets: &[Facet]) -> String {
    let mut out = String::new();
    out.push_str(&format!("solid {name}\n"));
    for facet in facets {
        let n = winding_normal(&facet.vertices);
        out.push_str(&format!(
            "facet normal {:.6} {:.6} {:.6}\n",
            n[0], n[1], n[2]
        ));
        out.push_str("outer loop\n");
        for v in &facet.vertices {
            out.push_str(&format!("vertex {:.6} {:.6} {:.6}\n", v[0], v[1], v[2]));
        }
        out.push_str("endloop\n");
        out.push_str("endfacet\n");
    }
    out.push_str(&format!("endsolid {name}\n"));
    out
}

/// Read a solid from an STL file on disk
pub fn read_file(path: impl AsRef<Path>) -> Result<StlSolid> {
    let text = std::fs::read_to_string(path)?;
    read(&text)
}

/// Write facets to an STL file on disk
pub fn write_file(path: impl AsRef<Path>, name: &str, facets: &[Facet]) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(write(name, facets).as_bytes())?;
    Ok(())
}
