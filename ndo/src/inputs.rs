use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

/// Policy parameters as given on the command line.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// The (whole) JSON parameters of the policy object
    ///
    /// This is a JSON object, e.g. `{"name": "ns1", "ptp": {"node_domain": 24}}`.
    #[arg(long("inputs-json"))]
    pub inputs_json: Option<String>,

    /// An individual parameter, in JSON format
    #[arg(long("input-json"), short('j'), number_of_values = 2, value_names = &["NAME", "JSON"])]
    pub input_json: Vec<String>,

    /// An individual parameter, as a raw string.
    ///
    /// This is equivalent to `--input-json NAME JSON` if JSON is the JSON string formatting of STR.
    #[arg(long("input-str"), short('s'), number_of_values = 2, value_names = &["NAME", "STR"])]
    pub input_str: Vec<String>,
}

impl InputArgs {
    /// Merge all given parameters into one object.
    ///
    /// clap does not tell us the order in which flags were given, so a
    /// later flag cannot override an earlier one. Duplicates are rejected
    /// instead, which leaves room for ordered overrides later.
    pub fn gather(&self) -> Result<Map<String, Value>> {
        let mut inputs = match &self.inputs_json {
            Some(json) => serde_json::from_str::<Map<String, Value>>(json)
                .context("failed to parse value of --inputs-json")?,
            None => Map::new(),
        };

        for pair in self.input_json.chunks_exact(2) {
            let (k, v) = (&pair[0], &pair[1]);
            if inputs.contains_key(k) {
                bail!("duplicate input: {}", k);
            }
            let value = serde_json::from_str(v)
                .with_context(|| format!("failed to parse JSON value for input: {}", k))?;
            inputs.insert(k.clone(), value);
        }
        for pair in self.input_str.chunks_exact(2) {
            let (k, v) = (&pair[0], &pair[1]);
            if inputs.contains_key(k) {
                bail!("duplicate input: {}", k);
            }
            inputs.insert(k.clone(), Value::String(v.clone()));
        }
        Ok(inputs)
    }
}
