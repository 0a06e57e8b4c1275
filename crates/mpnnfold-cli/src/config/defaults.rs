/// Values used for any setting that neither the config file nor the command line provides.
pub struct DefaultsConfig {
    pub model_name: String,
    pub structure: String,
    pub chains: String,
    pub num_sequences: usize,
    pub temperature: f64,
    pub num_models: usize,
    pub num_recycles: usize,
    pub max_predictions: usize,
    pub output_dir: String,
    pub designer_command: Vec<String>,
    pub predictor_command: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model_name: "v_48_020".to_string(),
            structure: "6MRR".to_string(),
            chains: "A".to_string(),
            num_sequences: 4,
            temperature: 0.1,
            num_models: 1,
            num_recycles: 1,
            max_predictions: 2,
            output_dir: "output".to_string(),
            designer_command: vec!["mpnnfold-worker".to_string(), "mpnn".to_string()],
            predictor_command: vec!["mpnnfold-worker".to_string(), "af".to_string()],
        }
    }
}
