//! Общий контракт шагов предобработки

use polars::prelude::DataFrame;

use crate::error::Result;

/// Шаг пайплайна с двумя состояниями: не обучен / обучен.
///
/// `fit` вычисляет статистики один раз и перезаписывает прежние.
/// `transform` только применяет сохранённые статистики и никогда их не
/// пересчитывает; вызов до `fit` возвращает `PipelineError::NotFitted`.
pub trait Transformer {
    fn fit(&mut self, data: &DataFrame) -> Result<()>;

    fn transform(&self, data: DataFrame) -> Result<DataFrame>;

    fn is_fitted(&self) -> bool;

    fn fit_transform(&mut self, data: DataFrame) -> Result<DataFrame> {
        self.fit(&data)?;
        self.transform(data)
    }
}
