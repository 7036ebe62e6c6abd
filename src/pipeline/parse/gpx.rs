use crate::error::ParseError;
use crate::pipeline::parse::Parser;
use crate::types::activity::RawPoint;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub struct GpxParser;

/// Where the reader currently sits in the `gpx > trk > trkseg > trkpt` chain.
#[derive(Debug, Default)]
struct Cursor {
    depth: usize,
    seen_root: bool,
    trk_depth: Option<usize>,
    seg_depth: Option<usize>,
    in_extensions: bool,
}

impl Parser for GpxParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawPoint>, ParseError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut points = Vec::new();
        let mut cursor = Cursor::default();
        let mut current_point: Option<RawPoint> = None;
        let mut current_element = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = local_name(&e)?;
                    cursor.enter(&name)?;

                    match name.as_str() {
                        "trk" if cursor.trk_depth.is_none() => cursor.trk_depth = Some(cursor.depth),
                        "trkseg" if cursor.trk_depth.is_some() && cursor.seg_depth.is_none() => {
                            cursor.seg_depth = Some(cursor.depth)
                        }
                        "trkpt" if cursor.seg_depth.is_some() && current_point.is_none() => {
                            current_point = Some(start_point(&e)?);
                        }
                        "extensions" if current_point.is_some() => cursor.in_extensions = true,
                        _ => current_element.clone_from(&name),
                    }
                }
                Ok(Event::Empty(e)) => {
                    let name = local_name(&e)?;
                    if !cursor.seen_root {
                        cursor.enter(&name)?;
                        cursor.depth -= 1;
                    }
                    // A self-closing trkpt has no <time> and is dropped later.
                    if name == "trkpt" && cursor.seg_depth.is_some() && current_point.is_none() {
                        points.push(start_point(&e)?);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(point) = current_point.as_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
                        apply_text(point, &current_element, cursor.in_extensions, &text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(point) = current_point.as_mut() {
                        let text = std::str::from_utf8(&e)
                            .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
                        apply_text(point, &current_element, cursor.in_extensions, text);
                    }
                }
                Ok(Event::End(e)) => {
                    let name = std::str::from_utf8(e.local_name().as_ref())
                        .map_err(|e| ParseError::InvalidGpx(e.to_string()))?
                        .to_string();

                    match name.as_str() {
                        "trkpt" => {
                            if let Some(point) = current_point.take() {
                                points.push(point);
                            }
                        }
                        "extensions" => cursor.in_extensions = false,
                        "trkseg" if cursor.seg_depth == Some(cursor.depth) => cursor.seg_depth = None,
                        "trk" if cursor.trk_depth == Some(cursor.depth) => cursor.trk_depth = None,
                        _ => {}
                    }
                    current_element.clear();
                    cursor.depth = cursor.depth.saturating_sub(1);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::InvalidGpx(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if !cursor.seen_root {
            return Err(ParseError::InvalidGpx("missing <gpx> root element".to_string()));
        }
        if cursor.depth != 0 {
            return Err(ParseError::InvalidGpx("unexpected end of document".to_string()));
        }

        Ok(points)
    }
}

impl Cursor {
    fn enter(&mut self, name: &str) -> Result<(), ParseError> {
        if !self.seen_root {
            if name != "gpx" {
                return Err(ParseError::InvalidGpx(format!(
                    "expected <gpx> root element, found <{}>",
                    name
                )));
            }
            self.seen_root = true;
        }
        self.depth += 1;
        Ok(())
    }
}

/// `ele` and `time` belong to the trkpt itself; `hr` only counts inside its
/// `<extensions>`.
fn apply_text(point: &mut RawPoint, element: &str, in_extensions: bool, text: &str) {
    let text = text.trim();
    match (element, in_extensions) {
        ("ele", false) => point.elevation = text.parse().ok(),
        ("time", false) => point.time.push_str(text),
        ("hr", true) => point.heart_rate = text.parse().ok(),
        _ => {}
    }
}

fn local_name(e: &BytesStart<'_>) -> Result<String, ParseError> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_string)
        .map_err(|e| ParseError::InvalidGpx(e.to_string()))
}

fn start_point(e: &BytesStart<'_>) -> Result<RawPoint, ParseError> {
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_coordinate(&value, "lat")?),
            b"lon" => lon = Some(parse_coordinate(&value, "lon")?),
            _ => {}
        }
    }

    Ok(RawPoint {
        lat: lat.ok_or(ParseError::InvalidCoordinate("lat"))?,
        lon: lon.ok_or(ParseError::InvalidCoordinate("lon"))?,
        elevation: None,
        heart_rate: None,
        time: String::new(),
    })
}

fn parse_coordinate(value: &str, name: &'static str) -> Result<f64, ParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidCoordinate(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(doc: &str) -> Result<Vec<RawPoint>, ParseError> {
        GpxParser.parse(doc.as_bytes())
    }

    #[test]
    fn flattens_tracks_and_segments_in_document_order() {
        let doc = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <trk><name>A</name>
    <trkseg>
      <trkpt lat="1.0" lon="2.0"><time>2020-01-02T15:04:05Z</time></trkpt>
      <trkpt lat="1.1" lon="2.1"><time>2020-01-02T15:04:06Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="1.2" lon="2.2"><time>2020-01-02T15:04:07Z</time></trkpt>
    </trkseg>
  </trk>
  <trk><trkseg>
    <trkpt lat="3.0" lon="4.0"><time>2020-01-02T15:05:00Z</time></trkpt>
  </trkseg></trk>
</gpx>"#;

        let points = parse(doc).unwrap();
        let lats: Vec<f64> = points.iter().map(|p| p.lat).collect();
        assert_eq!(lats, vec![1.0, 1.1, 1.2, 3.0]);
        assert_eq!(points[3].lon, 4.0);
        assert_eq!(points[2].time, "2020-01-02T15:04:07Z");
    }

    #[test]
    fn reads_elevation_and_garmin_heart_rate() {
        let doc = r#"<gpx xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
  <trk><trkseg>
    <trkpt lat="52.52" lon="13.405">
      <ele>34.5</ele>
      <time>2026-01-01T12:00:00Z</time>
      <extensions><gpxtpx:TrackPointExtension><gpxtpx:hr>141</gpxtpx:hr></gpxtpx:TrackPointExtension></extensions>
    </trkpt>
    <trkpt lat="52.53" lon="13.406"><time>2026-01-01T12:00:05Z</time></trkpt>
  </trkseg></trk>
</gpx>"#;

        let points = parse(doc).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].elevation, Some(34.5));
        assert_eq!(points[0].heart_rate, Some(141));
        assert_eq!(points[1].elevation, None);
        assert_eq!(points[1].heart_rate, None);
    }

    #[test]
    fn ignores_waypoints_and_unknown_siblings() {
        let doc = r#"<gpx>
  <metadata><time>2020-01-01T00:00:00Z</time></metadata>
  <wpt lat="9.0" lon="9.0"><time>2020-01-01T00:00:00Z</time></wpt>
  <trk><trkseg>
    <trkpt lat="1.0" lon="2.0"><time>t</time><cad>80</cad><hr>150</hr></trkpt>
  </trkseg></trk>
</gpx>"#;

        let points = parse(doc).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time, "t");
        // hr outside <extensions> is not the Garmin extension
        assert_eq!(points[0].heart_rate, None);
    }

    #[test]
    fn reads_cdata_text_like_plain_text() {
        let doc = r#"<gpx><trk><trkseg>
    <trkpt lat="1.0" lon="2.0"><ele><![CDATA[12.5]]></ele><time><![CDATA[2020-01-02T15:04:05Z]]></time></trkpt>
  </trkseg></trk></gpx>"#;

        let points = parse(doc).unwrap();
        assert_eq!(points[0].time, "2020-01-02T15:04:05Z");
        assert_eq!(points[0].elevation, Some(12.5));
    }

    #[test]
    fn extension_time_and_ele_do_not_leak_into_the_point() {
        let doc = r#"<gpx><trk><trkseg>
    <trkpt lat="1.0" lon="2.0">
      <ele>10</ele>
      <time>2020-01-02T15:04:05Z</time>
      <extensions><vendor:time>2020-01-02T16:00:00Z</vendor:time><vendor:ele>99</vendor:ele></extensions>
    </trkpt>
  </trkseg></trk></gpx>"#;

        let points = parse(doc).unwrap();
        assert_eq!(points[0].time, "2020-01-02T15:04:05Z");
        assert_eq!(points[0].elevation, Some(10.0));
    }

    #[test]
    fn keeps_points_without_time_for_later_filtering() {
        let doc = r#"<gpx><trk><trkseg>
    <trkpt lat="1.0" lon="2.0"/>
    <trkpt lat="1.5" lon="2.5"><ele>oops</ele></trkpt>
</trkseg></trk></gpx>"#;

        let points = parse(doc).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.time.is_empty()));
        assert_eq!(points[1].elevation, None);
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse("").is_err());
        assert!(parse("definitely not xml").is_err());
        assert!(parse("<kml><trk/></kml>").is_err());
        assert!(parse("<gpx><trk><trkseg></trk></gpx>").is_err());
        assert!(parse(r#"<gpx><trk><trkseg><trkpt lat="x" lon="1"/></trkseg></trk></gpx>"#).is_err());
        assert!(parse(r#"<gpx><trk><trkseg><trkpt lon="1"></trkpt></trkseg></trk></gpx>"#).is_err());
    }

    #[test]
    fn empty_track_is_not_a_parse_error() {
        assert_eq!(parse("<gpx></gpx>").unwrap(), Vec::new());
    }
}
