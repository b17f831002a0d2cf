use crate::domain::model::{Record, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn pipeline_name(&self) -> &str;
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn rules_path(&self) -> Option<&str>;
    fn max_records(&self) -> Option<usize>;

    /// 各輸出格式的檔名
    fn output_filename(&self, format: &str) -> String {
        match format {
            "csv" => "summary.csv".to_string(),
            "tsv" => "summary.tsv".to_string(),
            "report" => "run_report.json".to_string(),
            _ => "enriched.json".to_string(),
        }
    }

    /// 啟用壓縮時回傳 ZIP 檔名
    fn bundle_filename(&self) -> Option<&str> {
        None
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
