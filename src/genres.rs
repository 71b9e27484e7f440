use tracing::debug;

use crate::context::RequestContext;
use crate::error::Error;
use crate::models::GenreList;
use crate::researcher::Researcher;

impl Researcher {
    /// Genre seeds the provider accepts, in provider order.
    pub async fn genre_list(&self, ctx: &RequestContext) -> Result<GenreList, Error> {
        let client = self.sessions.get_session(ctx).await?;
        let genres = ctx
            .run(
                "client.GetAvailableGenreSeeds",
                client.get_available_genre_seeds(),
            )
            .await?
            .map_err(|e| Error::provider("client.GetAvailableGenreSeeds", e))?;
        debug!("provider returned {} genre seeds", genres.len());
        Ok(GenreList { genres })
    }
}
