//! Test results handler

use crate::handlers::{AttrMap, HandlerCore, XmlHandler};
use crate::ingest::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed,
    NotRun,
    Other,
}

impl TestStatus {
    fn from_attr(value: &str) -> Self {
        match value {
            "passed" => TestStatus::Passed,
            "failed" => TestStatus::Failed,
            "notrun" => TestStatus::NotRun,
            _ => TestStatus::Other,
        }
    }
}

/// One detailed `TEST` element.
#[derive(Debug)]
pub struct TestRecord {
    pub status: TestStatus,
    pub name: Option<String>,
    pub path: Option<String>,
    pub full_command_line: Option<String>,
    /// Execution time in seconds, from the matching named measurement.
    pub execution_time: Option<f64>,
}

#[derive(Debug, Default)]
pub struct TestingFacts {
    pub tests: Vec<TestRecord>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

impl TestingFacts {
    pub fn passed_count(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    pub fn not_run_count(&self) -> usize {
        self.count(TestStatus::NotRun)
    }

    fn count(&self, status: TestStatus) -> usize {
        self.tests.iter().filter(|t| t.status == status).count()
    }
}

#[derive(Debug, Default)]
pub struct TestingHandler {
    core: HandlerCore,
    text: String,
    current: Option<TestRecord>,
    /// True while inside the Execution Time named measurement of the
    /// current test.
    in_execution_time: bool,
    facts: TestingFacts,
}

impl TestingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_parts(self) -> (HandlerCore, TestingFacts) {
        (self.core, self.facts)
    }
}

impl XmlHandler for TestingHandler {
    async fn start_element(&mut self, name: &str, attributes: &AttrMap) -> Result<(), IngestError> {
        self.core.open(name, attributes);
        self.text.clear();
        match name {
            // Bare TEST elements inside TESTLIST carry no STATUS
            // attribute and are only an index; skip those.
            "TEST" => {
                if let Some(status) = attributes.get("STATUS") {
                    self.current = Some(TestRecord {
                        status: TestStatus::from_attr(status),
                        name: None,
                        path: None,
                        full_command_line: None,
                        execution_time: None,
                    });
                }
            }
            "NAMEDMEASUREMENT" => {
                self.in_execution_time =
                    attributes.get("NAME").map(String::as_str) == Some("Execution Time");
            }
            _ => {}
        }
        Ok(())
    }

    async fn end_element(&mut self, name: &str) -> Result<(), IngestError> {
        let text = std::mem::take(&mut self.text);
        match name {
            "TEST" => {
                if let Some(test) = self.current.take() {
                    self.facts.tests.push(test);
                }
            }
            "NAME" => {
                if let Some(test) = &mut self.current {
                    if test.name.is_none() {
                        test.name = Some(text);
                    }
                }
            }
            "PATH" => {
                if let Some(test) = &mut self.current {
                    if test.path.is_none() {
                        test.path = Some(text);
                    }
                }
            }
            "FULLCOMMANDLINE" => {
                if let Some(test) = &mut self.current {
                    test.full_command_line = Some(text);
                }
            }
            "VALUE" => {
                if self.in_execution_time {
                    if let Some(test) = &mut self.current {
                        test.execution_time = text.parse().ok();
                    }
                }
            }
            "NAMEDMEASUREMENT" => self.in_execution_time = false,
            "STARTTESTTIME" => self.facts.start_time = text.parse().ok(),
            "ENDTESTTIME" => self.facts.end_time = text.parse().ok(),
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

    const TESTING_XML: &str = r#"<Site BuildName="b" BuildStamp="s" Name="n">
  <Testing>
    <StartTestTime>1470000000</StartTestTime>
    <TestList>
      <Test>./core/t1</Test>
      <Test>./core/t2</Test>
    </TestList>
    <Test Status="passed">
      <Name>t1</Name>
      <Path>./core</Path>
      <FullCommandLine>/usr/bin/t1 --fast</FullCommandLine>
      <Results>
        <NamedMeasurement type="numeric/double" name="Execution Time">
          <Value>0.25</Value>
        </NamedMeasurement>
      </Results>
    </Test>
    <Test Status="failed">
      <Name>t2</Name>
      <Path>./core</Path>
    </Test>
    <EndTestTime>1470000060</EndTestTime>
  </Testing>
</Site>"#;

    #[tokio::test]
    async fn tallies_and_details() {
        let mut handler = TestingHandler::new();
        parse_buffer(TESTING_XML.as_bytes(), &mut handler).await.unwrap();

        let (_, facts) = handler.into_parts();
        assert_eq!(facts.tests.len(), 2);
        assert_eq!(facts.passed_count(), 1);
        assert_eq!(facts.failed_count(), 1);
        assert_eq!(facts.not_run_count(), 0);

        let t1 = &facts.tests[0];
        assert_eq!(t1.name.as_deref(), Some("t1"));
        assert_eq!(t1.execution_time, Some(0.25));
        assert_eq!(t1.full_command_line.as_deref(), Some("/usr/bin/t1 --fast"));
    }
}
