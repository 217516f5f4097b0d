//! Configure step handler

use crate::handlers::{AttrMap, HandlerCore, XmlHandler};
use crate::ingest::IngestError;

#[derive(Debug, Default)]
pub struct ConfigureFacts {
    pub command: Option<String>,
    pub status: Option<i64>,
    pub log: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

#[derive(Debug, Default)]
pub struct ConfigureHandler {
    core: HandlerCore,
    text: String,
    facts: ConfigureFacts,
}

impl ConfigureHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_parts(self) -> (HandlerCore, ConfigureFacts) {
        (self.core, self.facts)
    }
}

impl XmlHandler for ConfigureHandler {
    async fn start_element(&mut self, name: &str, attributes: &AttrMap) -> Result<(), IngestError> {
        self.core.open(name, attributes);
        self.text.clear();
        Ok(())
    }

    async fn end_element(&mut self, name: &str) -> Result<(), IngestError> {
        let text = std::mem::take(&mut self.text);
        match name {
            "CONFIGURECOMMAND" => self.facts.command = Some(text),
            "CONFIGURESTATUS" => self.facts.status = text.parse().ok(),
            "LOG" => self.facts.log = Some(text),
            "STARTCONFIGURETIME" => self.facts.start_time = text.parse().ok(),
            "ENDCONFIGURETIME" => self.facts.end_time = text.parse().ok(),
            _ => {}
        }
        self.core.close(name);
        Ok(())
    }

    fn text(&mut self, data: &str) {
        self.text.push_str(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_buffer;

    #[tokio::test]
    async fn extracts_command_status_and_log() {
        let xml = r#"<Site BuildName="b" BuildStamp="s" Name="n">
          <Configure>
            <ConfigureCommand>cmake ..</ConfigureCommand>
            <Log><![CDATA[-- Configuring done]]></Log>
            <ConfigureStatus>0</ConfigureStatus>
          </Configure>
        </Site>"#;
        let mut handler = ConfigureHandler::new();
        parse_buffer(xml.as_bytes(), &mut handler).await.unwrap();

        let (_, facts) = handler.into_parts();
        assert_eq!(facts.command.as_deref(), Some("cmake .."));
        assert_eq!(facts.status, Some(0));
        assert_eq!(facts.log.as_deref(), Some("-- Configuring done"));
    }
}
