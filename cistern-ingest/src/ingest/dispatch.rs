//! Streaming parse dispatch
//!
//! Feeds submission bytes through one incremental XML parser and
//! translates its events into handler calls. The parser is created once
//! per submission and keeps its own buffer across chunk refills, so
//! element boundaries split across chunks are invisible to handlers.
//!
//! Events are normalized before dispatch: element names and attribute
//! keys are uppercased, attribute values and character data are
//! unescaped, and self-closing elements are delivered as a start
//! immediately followed by an end.

use crate::handlers::{AttrMap, XmlHandler};
use crate::ingest::IngestError;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncRead, BufReader};

/// Chunk size for both content sniffing and streamed parsing.
pub const CHUNK_SIZE: usize = 8192;

/// Malformed submission payload
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a submission from a byte stream, refilling the parser in
/// fixed-size chunks.
pub async fn parse_stream<R, H>(reader: R, handler: &mut H) -> Result<(), IngestError>
where
    R: AsyncRead + Unpin,
    H: XmlHandler,
{
    let buffered = BufReader::with_capacity(CHUNK_SIZE, reader);
    let mut xml = Reader::from_reader(buffered);
    xml.config_mut().trim_text(true);
    drive(&mut xml, handler).await
}

/// Full-buffer fast path, used when a capped prefix read already holds
/// the entire payload. Observable event order is identical to
/// [`parse_stream`].
pub async fn parse_buffer<H>(buffer: &[u8], handler: &mut H) -> Result<(), IngestError>
where
    H: XmlHandler,
{
    let mut xml = Reader::from_reader(buffer);
    xml.config_mut().trim_text(true);
    drive(&mut xml, handler).await
}

async fn drive<R, H>(xml: &mut Reader<R>, handler: &mut H) -> Result<(), IngestError>
where
    R: AsyncBufRead + Unpin,
    H: XmlHandler,
{
    let decoder = xml.decoder();
    let mut buf = Vec::with_capacity(CHUNK_SIZE);
    loop {
        match xml.read_event_into_async(&mut buf).await.map_err(ParseError::Xml)? {
            Event::Start(e) => {
                let name = element_name(decoder, &e)?;
                let attributes = collect_attributes(decoder, &e)?;
                handler.start_element(&name, &attributes).await?;
            }
            Event::Empty(e) => {
                let name = element_name(decoder, &e)?;
                let attributes = collect_attributes(decoder, &e)?;
                handler.start_element(&name, &attributes).await?;
                handler.end_element(&name).await?;
            }
            Event::End(e) => {
                let name = decoder
                    .decode(e.name().as_ref())
                    .map_err(ParseError::Xml)?
                    .to_ascii_uppercase();
                handler.end_element(&name).await?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(ParseError::Xml)?;
                if !text.is_empty() {
                    handler.text(&text);
                }
            }
            Event::CData(t) => {
                let text = decoder.decode(&t).map_err(ParseError::Xml)?;
                handler.text(&text);
            }
            Event::Eof => return Ok(()),
            _ => {}
        }
        buf.clear();
    }
}

fn element_name(decoder: Decoder, e: &BytesStart) -> Result<String, IngestError> {
    Ok(decoder
        .decode(e.name().as_ref())
        .map_err(ParseError::Xml)?
        .to_ascii_uppercase())
}

fn collect_attributes(decoder: Decoder, e: &BytesStart) -> Result<AttrMap, IngestError> {
    let mut map = AttrMap::new();
    for attribute in e.attributes() {
        let attribute = attribute.map_err(|e| ParseError::Xml(e.into()))?;
        let key = decoder
            .decode(attribute.key.as_ref())
            .map_err(ParseError::Xml)?
            .to_ascii_uppercase();
        let value = attribute.unescape_value().map_err(ParseError::Xml)?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Records normalized events so paths can be compared.
    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl XmlHandler for Recorder {
        async fn start_element(
            &mut self,
            name: &str,
            attributes: &AttrMap,
        ) -> Result<(), IngestError> {
            let mut attrs: Vec<String> =
                attributes.iter().map(|(k, v)| format!("{k}={v}")).collect();
            attrs.sort();
            self.events.push(format!("start {name} [{}]", attrs.join(",")));
            Ok(())
        }

        async fn end_element(&mut self, name: &str) -> Result<(), IngestError> {
            self.events.push(format!("end {name}"));
            Ok(())
        }

        fn text(&mut self, data: &str) {
            self.events.push(format!("text {data}"));
        }
    }

    /// AsyncRead that yields one byte per read call, forcing every
    /// possible chunk boundary.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            if this.pos < this.data.len() {
                buf.put_slice(&this.data[this.pos..this.pos + 1]);
                this.pos += 1;
            }
            Poll::Ready(Ok(()))
        }
    }

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Site BuildName="linux-gcc" BuildStamp="20260807-0100-Nightly" Name="dashbot">
  <Build>
    <Error>
      <Text>undefined reference to `frobnicate&apos;</Text>
      <SourceFile>src/frob.c</SourceFile>
    </Error>
    <Warning/>
  </Build>
</Site>"#;

    #[tokio::test]
    async fn buffer_and_stream_paths_are_equivalent() {
        let mut from_buffer = Recorder::default();
        parse_buffer(DOC.as_bytes(), &mut from_buffer).await.unwrap();

        let mut from_stream = Recorder::default();
        parse_stream(DOC.as_bytes(), &mut from_stream).await.unwrap();

        let mut from_trickle = Recorder::default();
        parse_stream(
            Trickle { data: DOC.as_bytes().to_vec(), pos: 0 },
            &mut from_trickle,
        )
        .await
        .unwrap();

        assert!(!from_buffer.events.is_empty());
        assert_eq!(from_buffer.events, from_stream.events);
        assert_eq!(from_buffer.events, from_trickle.events);
    }

    #[tokio::test]
    async fn events_are_normalized() {
        let mut recorder = Recorder::default();
        parse_buffer(b"<project Name=\"p\"><subProject/></project>", &mut recorder)
            .await
            .unwrap();
        assert_eq!(
            recorder.events,
            vec![
                "start PROJECT [NAME=p]",
                "start SUBPROJECT []",
                "end SUBPROJECT",
                "end PROJECT",
            ]
        );
    }

    #[tokio::test]
    async fn text_is_unescaped_and_trimmed() {
        let mut recorder = Recorder::default();
        parse_buffer(b"<Path>  a &amp; b  </Path>", &mut recorder)
            .await
            .unwrap();
        assert_eq!(
            recorder.events,
            vec!["start PATH []", "text a & b", "end PATH"]
        );
    }

    #[tokio::test]
    async fn malformed_markup_is_a_parse_failure() {
        let mut recorder = Recorder::default();
        let err = parse_buffer(b"<Site><Build></Site>", &mut recorder)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Parse(ParseError::Xml(_))));
    }
}
