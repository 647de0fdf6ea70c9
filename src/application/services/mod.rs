pub mod news_pager;
