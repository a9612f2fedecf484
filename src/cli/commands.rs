use std::path::PathBuf;

use clap::Subcommand;

use crate::workflow::DEFAULT_CHART_LIST_URL;

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a legacy dump into resources
    Convert {
        /// Directory holding the dumped tables and attachments
        #[arg(long)]
        legacy_dir: Option<PathBuf>,

        /// Resolve release workspaces on the member cluster they run in
        #[arg(long)]
        multi_cluster_enable: bool,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Import chart archives as built-in applications
    Import {
        /// URL of a newline separated list of chart archive URLs
        #[arg(long, default_value = DEFAULT_CHART_LIST_URL)]
        chart_list_url: String,

        /// A chart archive, or a directory of them. Takes precedence over
        /// the chart list
        #[arg(long)]
        chart_path: Option<PathBuf>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}
