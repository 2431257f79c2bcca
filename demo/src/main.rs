use anyhow::{Context, Result, ensure};
use recfile::prelude::*;
use std::fmt;
use tracing_subscriber::EnvFilter;

const BUNDLED: &[u8] = include_bytes!("../assets/hello.xml");

#[derive(Debug, Default)]
struct Hello {
    a: i32,
    b: i32,
}

impl fmt::Display for Hello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a={},b={}", self.a, self.b)
    }
}

impl Record for Hello {
    const NAME: &'static str = "Hello";
    const FIELDS: &'static [Field] = &[
        Field::new("a", Kind::I32).attribute(),
        Field::new("b", Kind::I32),
    ];

    fn get(&self, field: &str) -> Result<Value, FieldError> {
        match field {
            "a" => Ok(Value::I32(self.a)),
            "b" => Ok(Value::I32(self.b)),
            _ => Err(FieldError::Unknown(field.to_string())),
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
        let slot = match field {
            "a" => &mut self.a,
            "b" => &mut self.b,
            _ => return Err(FieldError::Unknown(field.to_string())),
        };
        match value {
            Value::I32(v) => {
                *slot = v;
                Ok(())
            }
            other => Err(FieldError::Mismatch {
                field: field.to_string(),
                expected: Kind::I32,
                found: other.describe(),
            }),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let persist = Persist::builder().create_parent_dirs(true).build();
    let hello = Hello { a: 10, b: 20 };

    let bin = "out/hello_bytes.bytes";
    ensure!(
        persist.write_binary_to_file(bin, &hello),
        "Failed to write {}",
        bin
    );
    let from_bin: Hello = persist
        .read_binary_from_file(bin)
        .context("Failed to read binary file")?;
    println!("{}: {}", bin, from_bin);

    let xml = "out/hello.xml";
    ensure!(
        persist.write_text_to_file(xml, &hello),
        "Failed to write {}",
        xml
    );
    let from_xml: Hello = persist
        .read_text_from_file(xml)
        .context("Failed to read text file")?;
    println!("{}: {}", xml, from_xml);

    let bytes = std::fs::read(bin).context("Failed to load binary file into memory")?;
    let from_memory: Hello = persist
        .read_binary_from_buffer(&bytes)
        .context("Failed to read binary buffer")?;
    println!("memory: {}", from_memory);

    let bundled: Hello = persist
        .read_text_from_buffer(BUNDLED)
        .context("Failed to read bundled asset")?;
    println!("bundled: {}", bundled);

    Ok(())
}
