use anyhow::Context;
use structopt::StructOpt;

use discrim::classify::{Classifier, ForestConfig, LinearDiscriminant, RandomForest};
use discrim::pipeline::{self, FittedPipeline, PipelineConfig};
use discrim::table::{Dataset, Schema};

/// Compare discriminant and tree-ensemble classifiers on network intrusion records
#[derive(StructOpt, Debug)]
pub enum Discrim {

    /// Fit the encoding and reduction specs on a training table and save them as JSON
    Fit {
        /// Schema file (one `name: continuous.` / `name: symbolic.` line per attribute)
        schema : String,

        /// Training table (headerless CSV, label in the final column)
        train : String,

        #[structopt(short)]
        output : Option<String>,

        #[structopt(flatten)]
        config : ConfigOpt
    },

    /// Train one or both models and score them against the test table
    Eval {
        schema : String,

        train : String,

        test : String,

        /// Which model to run: lda, forest or both
        #[structopt(short, default_value = "both")]
        model : String,

        /// Prefix for the JSON reports (one `<prefix>_<model>.json` per model)
        #[structopt(short)]
        output : Option<String>,

        /// Print the forest's per-feature importance scores
        #[structopt(long)]
        importance : bool,

        #[structopt(flatten)]
        config : ConfigOpt,

        #[structopt(flatten)]
        forest : ForestOpt
    },

    /// Display the explained-variance spectrum of both reduction branches
    Summary {
        schema : String,

        train : String,

        #[structopt(flatten)]
        config : ConfigOpt
    }

}

#[derive(StructOpt, Debug)]
pub struct ConfigOpt {

    /// Principal components retained from the numeric block
    #[structopt(long, default_value = "20")]
    numeric_components : usize,

    /// Principal components retained from the dummy block
    #[structopt(long, default_value = "14")]
    dummy_components : usize,

    /// Nominal columns excluded from the dummy encoding
    #[structopt(long, default_value = "service")]
    exclude : Vec<String>

}

impl From<&ConfigOpt> for PipelineConfig {

    fn from(opt : &ConfigOpt) -> Self {
        Self {
            numeric_components : opt.numeric_components,
            dummy_components : opt.dummy_components,
            exclude : opt.exclude.clone()
        }
    }

}

#[derive(StructOpt, Debug)]
pub struct ForestOpt {

    #[structopt(long, default_value = "100")]
    trees : usize,

    #[structopt(long, default_value = "16")]
    max_depth : usize,

    #[structopt(long, default_value = "42")]
    seed : u64

}

impl From<&ForestOpt> for ForestConfig {

    fn from(opt : &ForestOpt) -> Self {
        Self {
            n_trees : opt.trees,
            max_depth : Some(opt.max_depth),
            seed : opt.seed,
            progress : true,
            ..Default::default()
        }
    }

}

fn load(schema : &str, table : &str) -> Result<(Schema, Dataset), anyhow::Error> {
    let schema = Schema::open(schema)
        .with_context(|| format!("opening schema '{}'", schema) )?;
    let data = Dataset::open(table, &schema)
        .with_context(|| format!("opening table '{}'", table) )?;
    Ok((schema, data))
}

fn run_model(
    classifier : &mut dyn Classifier,
    pipeline : &FittedPipeline,
    train : &Dataset,
    test : &Dataset,
    output : &Option<String>
) -> Result<(), anyhow::Error> {
    let eval = pipeline::evaluate(classifier, pipeline, train, test)?;
    println!("{}", eval);
    if let Some(prefix) = output {
        let path = format!("{}_{}.json", prefix, eval.model);
        eval.save(&path).with_context(|| format!("saving report '{}'", path) )?;
    }
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    match Discrim::from_args() {
        Discrim::Fit { schema, train, output, config } => {
            let (_, train) = load(&schema, &train)?;
            let pipeline = FittedPipeline::fit(&train, PipelineConfig::from(&config))?;
            match output {
                Some(path) => pipeline.save(&path)
                    .with_context(|| format!("saving pipeline '{}'", path) )?,
                None => println!("{}", serde_json::to_string(&pipeline)?)
            }
        },
        Discrim::Eval { schema, train, test, model, output, importance, config, forest } => {
            if !matches!(&model[..], "lda" | "forest" | "both") {
                anyhow::bail!("Unknown model: {}", model);
            }
            let (schema, train) = load(&schema, &train)?;
            let test = Dataset::open(&test, &schema)
                .with_context(|| format!("opening table '{}'", test) )?;
            let pipeline = FittedPipeline::fit(&train, PipelineConfig::from(&config))?;
            if model == "lda" || model == "both" {
                let mut lda = LinearDiscriminant::new();
                run_model(&mut lda, &pipeline, &train, &test, &output)?;
            }
            if model == "forest" || model == "both" {
                let mut rf = RandomForest::new(ForestConfig::from(&forest));
                run_model(&mut rf, &pipeline, &train, &test, &output)?;
                if importance {
                    if let Some(imp) = rf.importance() {
                        println!("feature importance (mean decrease in Gini, max = 1):");
                        for (i, v) in imp.iter().enumerate() {
                            println!("{:>6}{:>10.4}", i, v);
                        }
                    }
                }
            }
        },
        Discrim::Summary { schema, train, config } => {
            let (_, train) = load(&schema, &train)?;
            let pipeline = FittedPipeline::fit(&train, PipelineConfig::from(&config))?;
            for (name, reduction) in [
                ("numeric", pipeline.numeric_reduction()),
                ("dummy", pipeline.dummy_reduction())
            ].iter() {
                println!("{} branch ({} components):", name, reduction.n_components());
                let props = reduction.explained_variance();
                let cumulative = reduction.cumulative_variance();
                println!("{:>6}{:>12}{:>12}", "comp", "explained", "cumulative");
                for i in 0..props.len() {
                    println!("{:>6}{:>12.4}{:>12.4}", i + 1, props[i], cumulative[i]);
                }
                if !reduction.dropped_columns().is_empty() {
                    println!("dropped zero-variance columns: {:?}", reduction.dropped_columns());
                }
            }
        }
    }
    Ok(())
}
