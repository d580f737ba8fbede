/// STL file loading for binary and ASCII formats
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::map,
    multi::fold_many0,
    number::complete::float,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use nalgebra::Point3;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::geometry::{Line, Mesh, Triangle};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

#[derive(Debug, Error)]
pub enum StlError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),
    #[error("expected {expected} facets but data ends after {found}")]
    Truncated { expected: usize, found: usize },
    #[error("failed to parse ASCII STL: {0}")]
    Ascii(String),
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(StlError::TooSmall(data.len()));
    }

    let (count, body) = data[HEADER_LEN..].split_at(4);
    let expected = u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as usize;

    let facets = body.chunks_exact(FACET_LEN);
    if facets.len() < expected {
        return Err(StlError::Truncated {
            expected,
            found: facets.len(),
        });
    }

    let mut mesh = Mesh::with_capacity(expected);
    for facet in facets.take(expected) {
        // Skip the 12-byte normal; the trailing 2-byte attribute count is ignored
        let corner = |i: usize| {
            let at = 12 + i * 12;
            Point3::new(
                read_f32(&facet[at..]),
                read_f32(&facet[at + 4..]),
                read_f32(&facet[at + 8..]),
            )
        };
        mesh.add_triangle(Triangle::new(corner(0), corner(1), corner(2)));
    }

    Ok(mesh)
}

fn read_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, StlError> {
    solid(input)
        .map(|(_, mesh)| mesh)
        .map_err(|e| StlError::Ascii(e.to_string()))
}

/// `solid <name>`, any number of facets, `endsolid`
fn solid(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = pair(keyword("solid"), not_line_ending)(input)?;
    let (input, mesh) = fold_many0(facet, Mesh::new, |mut mesh, triangle| {
        mesh.add_triangle(triangle);
        mesh
    })(input)?;
    let (input, _) = keyword("endsolid")(input)?;
    Ok((input, mesh))
}

/// One facet. The normal is read but not kept; edges do not need it.
fn facet(input: &str) -> IResult<&str, Triangle> {
    let vertex = || preceded(keyword("vertex"), point);
    map(
        delimited(
            tuple((keyword("facet"), keyword("normal"), point)),
            delimited(
                pair(keyword("outer"), keyword("loop")),
                tuple((vertex(), vertex(), vertex())),
                keyword("endloop"),
            ),
            keyword("endfacet"),
        ),
        |(a, b, c)| Triangle::new(a, b, c),
    )(input)
}

/// Three whitespace-separated floats
fn point(input: &str) -> IResult<&str, Point3<f32>> {
    map(
        tuple((
            preceded(multispace1, float),
            preceded(multispace1, float),
            preceded(multispace1, float),
        )),
        |(x, y, z)| Point3::new(x, y, z),
    )(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    preceded(multispace0, tag(word))
}

/// Detect and parse STL data (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, StlError> {
    // Binary files may also start with "solid", so fall through on failure
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}

/// Read and parse an STL file from disk
pub fn load_stl(path: &Path) -> Result<Mesh, StlError> {
    let data = fs::read(path).map_err(|source| StlError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_stl(&data)
}

/// Load an STL file as a deduplicated set of wireframe lines.
///
/// Any failure is logged and yields an empty set, so a missing model
/// draws nothing instead of aborting the render loop.
pub fn open_stl_file(path: impl AsRef<Path>) -> Vec<Line> {
    let path = path.as_ref();
    match load_stl(path) {
        Ok(mesh) => {
            let lines = mesh.edges();
            log::debug!(
                "loaded {} triangles ({} lines) from {}",
                mesh.triangles.len(),
                lines.len(),
                path.display()
            );
            lines
        }
        Err(e) => {
            log::warn!("{e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_ASCII: &str = "solid tri
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid tri
";

    fn binary_stl(triangles: &[[f32; 9]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            data.extend_from_slice(&[0u8; 12]);
            for v in tri {
                data.extend_from_slice(&v.to_le_bytes());
            }
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        // Set triangle count to 0
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let result = parse_binary_stl(&data);
        assert!(result.is_ok());
        let mesh = result.unwrap();
        assert_eq!(mesh.triangles.len(), 0);
    }

    #[test]
    fn test_parse_binary_triangle() {
        let data = binary_stl(&[[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]]);
        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].vertices[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_parse_binary_truncated() {
        let mut data = binary_stl(&[[0.0; 9]]);
        data[80..84].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            parse_binary_stl(&data),
            Err(StlError::Truncated { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_parse_too_small() {
        assert!(matches!(parse_stl(b"solid"), Err(StlError::TooSmall(5))));
    }

    #[test]
    fn test_parse_ascii_triangle() {
        let mesh = parse_stl(TRIANGLE_ASCII.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].vertices[2], Point3::new(0.0, 1.0, 0.0));
        assert_eq!(mesh.edges().len(), 3);
    }

    #[test]
    fn test_parse_ascii_cube() {
        let mut text = String::from("solid cube exported by hand\n");
        for triangle in &Mesh::cube(2.0).triangles {
            text.push_str("facet normal 0 0 0\n outer loop\n");
            for v in triangle.vertices {
                text.push_str(&format!("  vertex {:e} {} {}\n", v.x, v.y, v.z));
            }
            text.push_str(" endloop\nendfacet\n");
        }
        text.push_str("endsolid cube\n");

        let mesh = parse_ascii_stl(&text).unwrap();
        assert_eq!(mesh.triangles, Mesh::cube(2.0).triangles);
    }

    #[test]
    fn test_parse_ascii_empty_solid() {
        let mesh = parse_ascii_stl("solid\nendsolid\n").unwrap();
        assert!(mesh.triangles.is_empty());
    }

    #[test]
    fn test_parse_ascii_malformed() {
        let missing_vertex = TRIANGLE_ASCII.replace("      vertex 0 1 0\n", "");
        assert!(matches!(
            parse_ascii_stl(&missing_vertex),
            Err(StlError::Ascii(_))
        ));

        let bad_number = TRIANGLE_ASCII.replace("vertex 1 0 0", "vertex 1 zero 0");
        assert!(parse_ascii_stl(&bad_number).is_err());

        let unterminated = TRIANGLE_ASCII.replace("endsolid tri\n", "");
        assert!(parse_ascii_stl(&unterminated).is_err());
    }

    #[test]
    fn test_malformed_ascii_header_falls_back_to_binary() {
        // Starts with "solid" but is neither valid ASCII STL nor long enough
        // to be binary
        let text = "solid broken\nfacet normal 0 0 1\n";
        assert!(matches!(
            parse_stl(text.as_bytes()),
            Err(StlError::TooSmall(_))
        ));
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        assert!(open_stl_file("/definitely/not/here.stl").is_empty());
    }
}
